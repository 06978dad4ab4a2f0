// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bridge from `tracing` events to [`Logger`]s.
//!
//! [`LoggerLayer`] converts every event into a [`LogRecord`] (message, fields,
//! file, line, module path) and hands it to a logger: either the registry's
//! current logger, looked up per event, or a fixed one.
//!
//! ```rust,ignore
//! runner_logger::layer::init_subscriber("info")?;
//! tracing::error!(error = &err as &dyn std::error::Error, "step failed");
//! ```

use crate::logger::Logger;
use crate::record::{Caller, FieldValue, LogLevel, LogRecord};
use crate::registry;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing_core::field::{Field, Visit};
use tracing_core::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{filter::ParseError, EnvFilter, Layer};

/// Targets silenced by default. The transport's own events, and those of the
/// delivery path, would otherwise loop back into the sink.
pub const QUIET_TARGETS: &str = "h2=off,hyper=off,hyper_util=off,reqwest=off,rustls=off,runner_logger::sink=off,runner_logger::token_manager=off,runner_logger::issuer=off";

/// Modules that run inside the sink worker. [`LoggerLayer`] never turns their
/// events into records, whatever filter the subscriber was built with.
const DELIVERY_TARGETS: [&str; 3] = [
    "runner_logger::sink",
    "runner_logger::token_manager",
    "runner_logger::issuer",
];

const MESSAGE_FIELD: &str = "message";
// Fields added by tracing-log for records coming from the `log` crate.
const LOG_FIELD_PREFIX: &str = "log.";

#[derive(Debug, Error)]
pub enum InitError {
    #[error("could not parse log level: {0}")]
    Filter(#[from] ParseError),
    #[error("could not install global subscriber: {0}")]
    Install(#[from] TryInitError),
}

#[derive(Debug, Clone, Default)]
pub struct LoggerLayer {
    fixed: Option<Arc<Logger>>,
}

impl LoggerLayer {
    /// Routes events to whatever logger the registry holds at the time.
    #[must_use]
    pub fn registry() -> Self {
        Self { fixed: None }
    }

    #[must_use]
    pub fn fixed(logger: Arc<Logger>) -> Self {
        Self {
            fixed: Some(logger),
        }
    }

    fn logger(&self) -> Arc<Logger> {
        match &self.fixed {
            Some(logger) => Arc::clone(logger),
            None => registry::current(),
        }
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if is_delivery_target(event.metadata().target()) {
            return;
        }
        let logger = self.logger();
        if !logger.enabled(LogLevel::from(event.metadata().level())) {
            return;
        }
        logger.log(record_from_event(event));
    }
}

fn is_delivery_target(target: &str) -> bool {
    DELIVERY_TARGETS
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

#[must_use]
pub fn record_from_event(event: &Event<'_>) -> LogRecord {
    let metadata = event.metadata();
    let mut visitor = RecordVisitor::default();
    event.record(&mut visitor);

    let caller = metadata.file().map(|file| Caller {
        file: file.to_string(),
        line: metadata.line().unwrap_or_default(),
        function: metadata.module_path().unwrap_or_default().to_string(),
    });

    LogRecord {
        time: Utc::now(),
        level: LogLevel::from(metadata.level()),
        message: visitor.message.unwrap_or_default(),
        fields: visitor.fields,
        caller,
    }
}

/// Installs a global subscriber that sends every event through the registry.
///
/// `level` is an `EnvFilter` directive such as `info` or `runner=debug`.
pub fn init_subscriber(level: &str) -> Result<(), InitError> {
    let filter = EnvFilter::try_new(format!("{QUIET_TARGETS},{level}"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(LoggerLayer::registry())
        .try_init()?;
    Ok(())
}

#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl RecordVisitor {
    fn insert(&mut self, field: &Field, value: FieldValue) {
        if field.name().starts_with(LOG_FIELD_PREFIX) {
            return;
        }
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for RecordVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::F64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::U64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, FieldValue::Str(value.to_string()));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, FieldValue::Error(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(format!("{value:?}"));
        } else {
            self.insert(field, FieldValue::Str(format!("{value:?}")));
        }
    }
}
