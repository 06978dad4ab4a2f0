// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::record::{LogLevel, ParseLevelError};
use crate::sink::buffered::BufferConfig;
use crate::sink::cloud_logging::DEFAULT_LOGGING_URL;
use crate::token_manager::EXPIRY_MARGIN;
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOG_NAME: &str = "runner.log";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid RUNNER_LOGGER_LEVEL: {0}")]
    Level(#[from] ParseLevelError),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the manager that issues logging tokens.
    pub manager_url: String,
    pub account_id: String,
    /// Token presented to the manager, not the logging token itself.
    pub delegate_token: String,
    /// Log id under the project, e.g. `runner.log`.
    pub log_name: String,
    pub logging_url: String,
    pub level: LogLevel,
    pub https_proxy: Option<String>,
    pub request_timeout: Duration,
    pub expiry_margin: Duration,
    pub buffer: BufferConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manager_url: String::new(),
            account_id: String::new(),
            delegate_token: String::new(),
            log_name: DEFAULT_LOG_NAME.to_string(),
            logging_url: DEFAULT_LOGGING_URL.to_string(),
            level: LogLevel::Info,
            https_proxy: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            expiry_margin: EXPIRY_MARGIN,
            buffer: BufferConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let level = match lookup("RUNNER_LOGGER_LEVEL") {
            Some(level) => level.parse()?,
            None => defaults.level,
        };

        Ok(Config {
            manager_url: lookup("RUNNER_LOGGER_MANAGER_URL").unwrap_or_default(),
            account_id: lookup("RUNNER_LOGGER_ACCOUNT_ID").unwrap_or_default(),
            delegate_token: lookup("RUNNER_LOGGER_DELEGATE_TOKEN").unwrap_or_default(),
            log_name: lookup("RUNNER_LOGGER_LOG_NAME").unwrap_or(defaults.log_name),
            logging_url: lookup("RUNNER_LOGGER_LOGGING_URL").unwrap_or(defaults.logging_url),
            level,
            https_proxy: lookup("RUNNER_LOGGER_PROXY_HTTPS").or_else(|| lookup("HTTPS_PROXY")),
            ..defaults
        })
    }
}
