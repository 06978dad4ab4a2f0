// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log hook that forwards records to the remote sink.
//!
//! For every record the adapter builds a [`SinkEntry`]:
//!
//! ```text
//! {
//!   "message": "...",
//!   "fields": { ... },
//!   "reportLocation": { "filePath": "...", "functionName": "...", "lineNumber": 42 },
//!   "error": "..."
//! }
//! ```
//!
//! `reportLocation` is present when the record carries a caller and `error`
//! when the reserved error field holds an actual error value. Entries with
//! severity `ERROR` or above also print a one-line diagnostic locally.

use crate::logger::{HookError, LogHook};
use crate::record::LogRecord;
use crate::severity::{map_level, Severity};
use crate::sink::buffered::{BufferedSink, DeliveryError, DeliveryStats};
use crate::sink::{SinkEntry, SinkError};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const ERR_CODE_KEY: &str = "ErrCode";
pub const ERR_DESCRIPTION_KEY: &str = "ErrDescription";
pub const ENV_KEY: &str = "env";

/// Local channel for the secondary diagnostic of high-severity records.
pub type OnDiagnostic = Arc<dyn Fn(&str) + Send + Sync>;

#[must_use]
pub fn print_diagnostic() -> OnDiagnostic {
    Arc::new(|line| eprintln!("{line}"))
}

pub struct LogSinkAdapter {
    sink: BufferedSink,
    on_diagnostic: OnDiagnostic,
}

impl LogSinkAdapter {
    /// Adapter printing its diagnostics to stderr.
    #[must_use]
    pub fn new(sink: BufferedSink) -> Self {
        Self::with_diagnostic(sink, print_diagnostic())
    }

    #[must_use]
    pub fn with_diagnostic(sink: BufferedSink, on_diagnostic: OnDiagnostic) -> Self {
        Self {
            sink,
            on_diagnostic,
        }
    }

    /// Queues `record` for delivery. Errors only describe what happened to this
    /// record; the caller is free to ignore them.
    pub fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let entry = build_entry(record);
        let severity = entry.severity;
        let queued = self.sink.log(entry);

        if severity >= Severity::Error {
            (self.on_diagnostic)(&format_diagnostic(record));
        }
        queued
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.sink.stats()
    }

    /// Flushes pending entries and releases the transport. Call once at shutdown.
    pub async fn close(&self) -> Result<(), SinkError> {
        self.sink.close().await
    }
}

impl LogHook for LogSinkAdapter {
    fn fire(&self, record: &LogRecord) -> Result<(), HookError> {
        self.deliver(record).map_err(Into::into)
    }
}

#[must_use]
pub fn build_entry(record: &LogRecord) -> SinkEntry {
    let fields: Map<String, Value> = record
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();

    let mut payload = Map::new();
    payload.insert("message".to_string(), Value::String(record.message.clone()));
    payload.insert("fields".to_string(), Value::Object(fields));

    if let Some(caller) = &record.caller {
        payload.insert(
            "reportLocation".to_string(),
            json!({
                "filePath": caller.file,
                "functionName": caller.function,
                "lineNumber": caller.line,
            }),
        );
    }

    if let Some(err) = record.error() {
        payload.insert("error".to_string(), Value::String(err.to_string()));
    }

    SinkEntry {
        payload,
        severity: map_level(record.level),
    }
}

/// Secondary diagnostic line for high-severity records.
#[must_use]
pub fn format_diagnostic(record: &LogRecord) -> String {
    let field = |key: &str| {
        record
            .field(key)
            .map_or_else(|| "<nil>".to_string(), ToString::to_string)
    };
    format!(
        "error: {}, Code: {}, Description: {}, Message: {}, Env: {}",
        field(crate::record::ERROR_KEY),
        field(ERR_CODE_KEY),
        field(ERR_DESCRIPTION_KEY),
        record.message,
        field(ENV_KEY),
    )
}
