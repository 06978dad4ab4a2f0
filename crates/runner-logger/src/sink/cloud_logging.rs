// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Google Cloud Logging transport.
//!
//! Each batch becomes one `POST {endpoint}/v2/entries:write`. The bearer token
//! is looked up through the [`TokenSource`] on every request, so credential
//! refresh happens transparently underneath the sink.

use super::{LogSink, SinkEntry, SinkError};
use crate::token_manager::TokenSource;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_LOGGING_URL: &str = "https://logging.googleapis.com";
const WRITE_PATH: &str = "v2/entries:write";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest<'a> {
    log_name: &'a str,
    resource: MonitoredResource,
    entries: &'a [SinkEntry],
}

#[derive(Serialize)]
struct MonitoredResource {
    #[serde(rename = "type")]
    kind: &'static str,
}

pub struct CloudLoggingSink {
    client: reqwest::Client,
    url: String,
    log_name: String,
    token_source: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl CloudLoggingSink {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        project_id: &str,
        log_id: &str,
        token_source: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: format!("{}/{WRITE_PATH}", endpoint.trim_end_matches('/')),
            log_name: log_name(project_id, log_id),
            token_source,
            timeout,
        }
    }

    #[must_use]
    pub fn log_name(&self) -> &str {
        &self.log_name
    }
}

/// `projects/{project}/logs/{log_id}` with the log id's slashes escaped.
#[must_use]
pub fn log_name(project_id: &str, log_id: &str) -> String {
    format!("projects/{project_id}/logs/{}", log_id.replace('/', "%2F"))
}

#[async_trait]
impl LogSink for CloudLoggingSink {
    async fn write_entries(&self, entries: Vec<SinkEntry>) -> Result<(), SinkError> {
        if entries.is_empty() {
            return Ok(());
        }
        let token = self.token_source.token().await?;
        let body = WriteRequest {
            log_name: &self.log_name,
            resource: MonitoredResource { kind: "global" },
            entries: &entries,
        };

        let start = Instant::now();
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(token.access_token())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        debug!(
            "Wrote {} log entries in {} ms with status {status}",
            entries.len(),
            start.elapsed().as_millis()
        );

        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SinkError::Status { status, body })
    }
}
