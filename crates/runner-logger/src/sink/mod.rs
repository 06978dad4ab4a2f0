// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote log sink.
//!
//! ```text
//!   LogSinkAdapter ──try_send──> BufferedSink queue ──> worker ──> LogSink::write_entries
//!                                                          │
//!                                                       on_error (local print)
//! ```
//!
//! - **[`cloud_logging`]**: `LogSink` implementation for the Cloud Logging
//!   `entries:write` API, authenticated per request through a `TokenSource`
//! - **[`buffered`]**: bounded queue plus background worker that batches
//!   entries and reports failures out of band

pub mod buffered;
pub mod cloud_logging;

use crate::severity::Severity;
use crate::token_manager::TokenError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// One entry as sent to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkEntry {
    #[serde(rename = "jsonPayload")]
    pub payload: Map<String, Value>,
    pub severity: Severity,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("could not obtain logging token: {0}")]
    Token(#[from] TokenError),
    #[error("request to log sink failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("log sink responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("log sink worker stopped unexpectedly: {0}")]
    Worker(String),
    #[error("log sink is already closed")]
    Closed,
}

#[async_trait]
pub trait LogSink: Send + Sync {
    async fn write_entries(&self, entries: Vec<SinkEntry>) -> Result<(), SinkError>;

    /// Releases transport resources. Called once, after the last write.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Out-of-band error callback for failed writes.
pub type OnError = Arc<dyn Fn(&SinkError) + Send + Sync>;

#[must_use]
pub fn print_on_error() -> OnError {
    Arc::new(|err| eprintln!("Error detected from cloud logging: {err}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that remembers every batch and can be told to fail.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub(crate) batches: Mutex<Vec<Vec<SinkEntry>>>,
        pub(crate) fail: std::sync::atomic::AtomicBool,
        pub(crate) closed: std::sync::atomic::AtomicBool,
    }

    impl MemorySink {
        pub(crate) fn entries(&self) -> Vec<SinkEntry> {
            self.batches
                .lock()
                .expect("lock poisoned")
                .iter()
                .flatten()
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl LogSink for MemorySink {
        async fn write_entries(&self, entries: Vec<SinkEntry>) -> Result<(), SinkError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(SinkError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "unavailable".to_string(),
                });
            }
            self.batches.lock().expect("lock poisoned").push(entries);
            Ok(())
        }

        async fn close(&self) -> Result<(), SinkError> {
            self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn entry_serializes_in_api_shape() {
        let mut payload = Map::new();
        payload.insert("message".to_string(), Value::String("x".to_string()));
        let entry = SinkEntry {
            payload,
            severity: Severity::Error,
        };
        let value = serde_json::to_value(&entry).expect("serialize failed");
        assert_eq!(
            value,
            serde_json::json!({"jsonPayload": {"message": "x"}, "severity": "ERROR"})
        );
    }
}
