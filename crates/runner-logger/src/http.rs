// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared HTTP client for the credential issuer and the log sink.

use crate::config::Config;
use core::time::Duration;
use reqwest::ClientBuilder;
use tracing::error;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(270);
const TCP_KEEPALIVE: Duration = Duration::from_secs(120);

/// Builds the client from `config`. An unusable proxy setting is logged and
/// the client falls back to a direct connection.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match base_builder(config).build() {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn base_builder(config: &Config) -> ClientBuilder {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(config.request_timeout)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
}

fn build_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = base_builder(config);
    if let Some(proxy) = &config.https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    builder.build()
}
