// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Startup and shutdown of remote logging.
//!
//! # Startup
//!
//! 1. Mint the first credential (fails fast if the issuer is unusable)
//! 2. Bind a Cloud Logging sink to the credential's project
//! 3. Wrap the sink in a buffered [`LogSinkAdapter`]
//! 4. Build a logger with caller reporting and the adapter as hook
//! 5. Swap the registry to the new logger
//!
//! Steps 1-4 are available on their own through [`RemoteLogger::build`] for
//! callers that pass the logger around explicitly.

use crate::adapter::LogSinkAdapter;
use crate::config::Config;
use crate::http::get_client;
use crate::issuer::{IssuerError, ManagerClient, TokenIssuer};
use crate::logger::Logger;
use crate::registry;
use crate::sink::buffered::{BufferedSink, DeliveryStats};
use crate::sink::cloud_logging::CloudLoggingSink;
use crate::sink::{print_on_error, SinkError};
use crate::token_manager::{TokenError, TokenManager};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to initialize token provider: {0}")]
    Token(#[from] TokenError),
    #[error("failed to create credential issuer: {0}")]
    Issuer(#[from] IssuerError),
}

pub struct RemoteLogger {
    token_manager: Arc<TokenManager>,
    adapter: Arc<LogSinkAdapter>,
    logger: Arc<Logger>,
}

impl RemoteLogger {
    /// Starts remote logging against the manager described by `config`.
    pub async fn start_with_manager(config: &Config) -> Result<Self, StartError> {
        let client = get_client(config);
        let issuer = ManagerClient::new(
            client.clone(),
            &config.manager_url,
            &config.account_id,
            &config.delegate_token,
            config.request_timeout,
        )?;
        Self::start(config, Arc::new(issuer), client).await
    }

    /// Builds the pipeline and installs its logger as the process default.
    pub async fn start(
        config: &Config,
        issuer: Arc<dyn TokenIssuer>,
        client: reqwest::Client,
    ) -> Result<Self, StartError> {
        let remote = Self::build(config, issuer, client).await?;
        registry::replace_arc(Arc::clone(&remote.logger));
        info!(
            "Remote logging started for project {}",
            remote.token_manager.project_id()
        );
        Ok(remote)
    }

    /// Builds the pipeline without touching the registry.
    pub async fn build(
        config: &Config,
        issuer: Arc<dyn TokenIssuer>,
        client: reqwest::Client,
    ) -> Result<Self, StartError> {
        let token_manager =
            Arc::new(TokenManager::with_margin(issuer, config.expiry_margin).await?);

        let sink = CloudLoggingSink::new(
            client,
            &config.logging_url,
            &token_manager.project_id(),
            &config.log_name,
            Arc::clone(&token_manager) as _,
            config.request_timeout,
        );
        let adapter = Arc::new(LogSinkAdapter::new(BufferedSink::new(
            Arc::new(sink),
            config.buffer,
            print_on_error(),
        )));

        let logger = Arc::new(
            Logger::builder()
                .level(config.level)
                .report_caller(true)
                .hook(Arc::clone(&adapter) as _)
                .build(),
        );

        Ok(Self {
            token_manager,
            adapter,
            logger,
        })
    }

    #[must_use]
    pub fn logger(&self) -> Arc<Logger> {
        Arc::clone(&self.logger)
    }

    #[must_use]
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.adapter.stats()
    }

    /// Flushes queued entries and closes the sink. Records logged afterwards are dropped.
    pub async fn stop(&self) -> Result<(), SinkError> {
        self.adapter.close().await
    }
}
