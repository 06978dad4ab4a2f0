// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Leveled logger with hooks and local JSON rendering.
//!
//! A [`Logger`] filters records by level, hands each record to every
//! registered [`LogHook`] that subscribes to that level, then writes one JSON
//! line to its local output.
//!
//! ```text
//! {"file":"main.rs:42","level":"info","msg":"runner started","time":"2025-01-01T00:00:00Z"}
//! ```

use crate::record::{LogLevel, LogRecord};
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Receiver of log records. Hooks run on the logging thread, so they must not block.
pub trait LogHook: Send + Sync {
    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    fn fire(&self, record: &LogRecord) -> Result<(), HookError>;
}

const TIME_KEY: &str = "time";
const LEVEL_KEY: &str = "level";
const MSG_KEY: &str = "msg";
const FILE_KEY: &str = "file";

/// Renders records as single-line JSON objects with RFC 3339 timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    #[must_use]
    pub fn format(&self, record: &LogRecord) -> String {
        let mut object = Map::new();
        for (key, value) in &record.fields {
            // Record fields never shadow the built-in keys.
            let key = match key.as_str() {
                TIME_KEY | LEVEL_KEY | MSG_KEY | FILE_KEY => format!("fields.{key}"),
                _ => key.clone(),
            };
            object.insert(key, value.to_json());
        }
        object.insert(
            TIME_KEY.to_string(),
            Value::String(record.time.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        object.insert(
            LEVEL_KEY.to_string(),
            Value::String(record.level.as_str().to_string()),
        );
        object.insert(MSG_KEY.to_string(), Value::String(record.message.clone()));
        if let Some(caller) = &record.caller {
            object.insert(FILE_KEY.to_string(), Value::String(caller.short()));
        }
        Value::Object(object).to_string()
    }
}

type Output = Mutex<Box<dyn Write + Send>>;

pub struct Logger {
    level: LogLevel,
    report_caller: bool,
    formatter: JsonFormatter,
    output: Option<Output>,
    hooks: Vec<Arc<dyn LogHook>>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    #[must_use]
    pub fn reports_caller(&self) -> bool {
        self.report_caller
    }

    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn log(&self, mut record: LogRecord) {
        if !self.enabled(record.level) {
            return;
        }
        if !self.report_caller {
            record.caller = None;
        }

        for hook in &self.hooks {
            if !hook.levels().contains(&record.level) {
                continue;
            }
            if let Err(e) = hook.fire(&record) {
                eprintln!("Failed to fire hook: {e}");
            }
        }

        if let Some(output) = &self.output {
            let line = self.formatter.format(&record);
            let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = writeln!(out, "{line}") {
                eprintln!("Failed to write log line: {e}");
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::builder().build()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("report_caller", &self.report_caller)
            .field("hooks", &self.hooks.len())
            .field("local_output", &self.output.is_some())
            .finish()
    }
}

pub struct LoggerBuilder {
    level: LogLevel,
    report_caller: bool,
    output: Option<Box<dyn Write + Send>>,
    hooks: Vec<Arc<dyn LogHook>>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            report_caller: false,
            output: Some(Box::new(io::stderr())),
            hooks: Vec::new(),
        }
    }
}

impl LoggerBuilder {
    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn report_caller(mut self, report_caller: bool) -> Self {
        self.report_caller = report_caller;
        self
    }

    #[must_use]
    pub fn output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = Some(output);
        self
    }

    /// Disables local rendering; records only reach the hooks.
    #[must_use]
    pub fn without_output(mut self) -> Self {
        self.output = None;
        self
    }

    #[must_use]
    pub fn hook(mut self, hook: Arc<dyn LogHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn build(self) -> Logger {
        Logger {
            level: self.level,
            report_caller: self.report_caller,
            formatter: JsonFormatter,
            output: self.output.map(Mutex::new),
            hooks: self.hooks,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::{Caller, ERROR_KEY};
    use chrono::{TimeZone, Utc};

    /// In-memory writer whose contents outlive the logger.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().expect("lock poisoned").clone();
            String::from_utf8(bytes)
                .expect("invalid utf8")
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingHook {
        pub(crate) records: Mutex<Vec<LogRecord>>,
    }

    impl LogHook for RecordingHook {
        fn fire(&self, record: &LogRecord) -> Result<(), HookError> {
            self.records
                .lock()
                .expect("lock poisoned")
                .push(record.clone());
            Ok(())
        }
    }

    struct ErrorsOnly(RecordingHook);

    impl LogHook for ErrorsOnly {
        fn levels(&self) -> &[LogLevel] {
            &[LogLevel::Error, LogLevel::Fatal, LogLevel::Panic]
        }

        fn fire(&self, record: &LogRecord) -> Result<(), HookError> {
            self.0.fire(record)
        }
    }

    struct FailingHook;

    impl LogHook for FailingHook {
        fn fire(&self, _record: &LogRecord) -> Result<(), HookError> {
            Err("sink unavailable".into())
        }
    }

    fn fixed_record() -> LogRecord {
        let mut record = LogRecord::new(LogLevel::Info, "runner started")
            .with_field("port", 8080)
            .with_field("msg", "shadowed");
        record.time = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        record.caller = Some(Caller {
            file: "/src/app/main.rs".to_string(),
            line: 42,
            function: String::new(),
        });
        record
    }

    #[test]
    fn formats_json_line() {
        let line = JsonFormatter.format(&fixed_record());
        let value: Value = serde_json::from_str(&line).expect("invalid json");
        assert_eq!(value["time"], "2025-01-02T03:04:05Z");
        assert_eq!(value["level"], "info");
        assert_eq!(value["msg"], "runner started");
        assert_eq!(value["file"], "main.rs:42");
        assert_eq!(value["port"], 8080);
        assert_eq!(value["fields.msg"], "shadowed");
    }

    #[test]
    fn filters_below_level() {
        let buffer = SharedBuffer::default();
        let hook = Arc::new(RecordingHook::default());
        let logger = Logger::builder()
            .level(LogLevel::Warn)
            .output(Box::new(buffer.clone()))
            .hook(hook.clone())
            .build();

        logger.log(LogRecord::new(LogLevel::Info, "quiet"));
        logger.log(LogRecord::new(LogLevel::Error, "loud"));

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("loud"));
        assert_eq!(hook.records.lock().expect("lock poisoned").len(), 1);
    }

    #[test]
    fn hooks_only_receive_subscribed_levels() {
        let hook = Arc::new(ErrorsOnly(RecordingHook::default()));
        let logger = Logger::builder()
            .level(LogLevel::Trace)
            .without_output()
            .hook(hook.clone())
            .build();

        logger.log(LogRecord::new(LogLevel::Debug, "ignored"));
        logger.log(LogRecord::new(LogLevel::Fatal, "kept"));

        let records = hook.0.records.lock().expect("lock poisoned");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "kept");
    }

    #[test]
    fn caller_is_stripped_unless_reported() {
        let hook = Arc::new(RecordingHook::default());
        let logger = Logger::builder()
            .without_output()
            .hook(hook.clone())
            .build();
        logger.log(LogRecord::new(LogLevel::Info, "x"));

        let reporting_hook = Arc::new(RecordingHook::default());
        let reporting = Logger::builder()
            .report_caller(true)
            .without_output()
            .hook(reporting_hook.clone())
            .build();
        reporting.log(LogRecord::new(LogLevel::Info, "x"));

        assert!(hook.records.lock().expect("lock poisoned")[0]
            .caller
            .is_none());
        assert!(reporting_hook.records.lock().expect("lock poisoned")[0]
            .caller
            .is_some());
    }

    #[test]
    fn failing_hook_does_not_stop_logging() {
        let buffer = SharedBuffer::default();
        let after = Arc::new(RecordingHook::default());
        let logger = Logger::builder()
            .output(Box::new(buffer.clone()))
            .hook(Arc::new(FailingHook))
            .hook(after.clone())
            .build();

        logger.log(LogRecord::new(LogLevel::Error, "still here").with_field(ERROR_KEY, "x"));

        assert_eq!(buffer.lines().len(), 1);
        assert_eq!(after.records.lock().expect("lock poisoned").len(), 1);
    }

    #[test]
    fn default_logger_is_info_without_hooks() {
        let logger = Logger::default();
        assert_eq!(logger.level(), LogLevel::Info);
        assert_eq!(logger.hook_count(), 0);
        assert!(!logger.reports_caller());
    }
}
