// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide logging for the runner, forwarded to Google Cloud Logging.
//!
//! - **[`token_manager`]**: cached, proactively refreshed logging credentials
//!   minted by the manager ([`issuer`])
//! - **[`severity`]**: log level to Cloud Logging severity mapping
//! - **[`adapter`]**: log hook that turns records into sink entries
//! - **[`registry`]**: the swappable process-wide logger
//! - **[`layer`]**: `tracing` integration on top of the registry
//! - **[`remote_logger`]**: wires the pieces together at startup

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod adapter;
pub mod cache;
pub mod config;
pub mod credential;
pub mod http;
pub mod issuer;
pub mod layer;
pub mod logger;
pub mod record;
pub mod registry;
pub mod remote_logger;
pub mod severity;
pub mod sink;
pub mod token_manager;

pub use adapter::{LogSinkAdapter, OnDiagnostic};
pub use config::{Config, ConfigError};
pub use credential::{Credential, IssuedToken};
pub use issuer::{IssuerError, ManagerClient, TokenIssuer};
pub use layer::{init_subscriber, LoggerLayer};
pub use logger::{LogHook, Logger, LoggerBuilder};
pub use record::{FieldValue, LogLevel, LogRecord};
pub use remote_logger::{RemoteLogger, StartError};
pub use severity::{map_level, map_level_name, Severity};
pub use sink::buffered::{DeliveryError, DeliveryStats};
pub use token_manager::{TokenError, TokenManager, TokenSource};
