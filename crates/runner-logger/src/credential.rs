// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delegated logging credentials.
//!
//! [`IssuedToken`] is the raw shape returned by the credential issuer;
//! [`Credential`] is what the rest of the crate hands around once the token has
//! been validated by the [`TokenManager`](crate::token_manager::TokenManager).

use serde::Deserialize;
use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Token tuple as returned by the manager's logging-token endpoint.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    #[serde(default)]
    pub token_value: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub expiration_time_millis: i64,
}

impl IssuedToken {
    /// Absolute expiry, or `None` when the millisecond timestamp is not after the epoch.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        let millis = u64::try_from(self.expiration_time_millis).ok()?;
        if millis == 0 {
            return None;
        }
        UNIX_EPOCH.checked_add(Duration::from_millis(millis))
    }
}

impl Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token_value", &redact(&self.token_value))
            .field("project_id", &self.project_id)
            .field("expiration_time_millis", &self.expiration_time_millis)
            .finish()
    }
}

/// A validated access token. Instances are immutable and shared behind `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
    expires_at: SystemTime,
    project_id: String,
}

impl Credential {
    pub(crate) fn new(access_token: String, expires_at: SystemTime, project_id: String) -> Self {
        Self {
            access_token,
            expires_at,
            project_id,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Remaining validity measured against `now`; zero once expired.
    #[must_use]
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.expires_at.duration_since(now).unwrap_or(Duration::ZERO)
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field("project_id", &self.project_id)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
