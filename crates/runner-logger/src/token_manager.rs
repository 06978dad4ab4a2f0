// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fetches, validates and caches the logging credential.
//!
//! # Lifecycle
//!
//! ```text
//!   TokenManager::new ──> refresh() ──> issuer ──> validate ──> cache.set
//!                                                                  │
//!   token() ──> cache.get ── hit ──────────────────────────────────┘
//!                  │
//!                 miss ──> refresh gate ──> refresh()
//! ```
//!
//! The cache deadline is `expires_at - margin`, so every credential returned by
//! [`TokenManager::token`] has at least `margin` of validity left when it was
//! stored. The TTL is computed from a wall-clock read and the deadline from a
//! monotonic read a moment later; the margin is therefore a lower bound that
//! can be shaved by the time spent between the two reads.

use crate::cache::{cache_ttl, CredentialCache};
use crate::credential::{Credential, IssuedToken};
use crate::issuer::{IssuerError, TokenIssuer};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, error, info};

pub const EXPIRY_MARGIN: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no log token defined on the server")]
    NoToken,
    #[error("expired token")]
    Expired,
    #[error("no project id defined for the log token")]
    MissingProject,
    #[error("failed to fetch logger credentials from the server: {0}")]
    Transport(#[from] IssuerError),
}

/// Anything able to hand out a currently valid credential.
///
/// The sink transport holds one of these and asks it for a token on every
/// outbound request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Arc<Credential>, TokenError>;
}

pub struct TokenManager {
    issuer: Arc<dyn TokenIssuer>,
    cache: CredentialCache,
    margin: Duration,
    // Serialises refreshes triggered by cache misses so concurrent callers
    // share one issuer round-trip.
    refresh_gate: TokioMutex<()>,
}

impl TokenManager {
    /// Builds the manager and mints the first credential. Fails if the issuer is
    /// unreachable or hands out an unusable token.
    pub async fn new(issuer: Arc<dyn TokenIssuer>) -> Result<Self, TokenError> {
        Self::with_margin(issuer, EXPIRY_MARGIN).await
    }

    pub async fn with_margin(
        issuer: Arc<dyn TokenIssuer>,
        margin: Duration,
    ) -> Result<Self, TokenError> {
        let manager = Self {
            issuer,
            cache: CredentialCache::new(),
            margin,
            refresh_gate: TokioMutex::new(()),
        };
        manager.refresh().await?;
        Ok(manager)
    }

    /// Returns the cached credential, refreshing it synchronously when the
    /// cache entry is missing or past its deadline.
    pub async fn token(&self) -> Result<Arc<Credential>, TokenError> {
        if let Some(credential) = self.cache.get() {
            return Ok(credential);
        }

        let _gate = self.refresh_gate.lock().await;
        if let Some(credential) = self.cache.get() {
            debug!("Logging token refreshed by a concurrent caller");
            return Ok(credential);
        }

        // TODO: retry transient issuer failures with backoff before surfacing them
        info!("refreshing logging token");
        self.refresh().await.inspect_err(|e| {
            error!("cannot refresh logging token: {e}");
        })
    }

    /// Calls the issuer once and, if the token is usable, replaces the cache entry.
    /// On failure the cache is left as it was.
    pub async fn refresh(&self) -> Result<Arc<Credential>, TokenError> {
        let issued = self.issuer.get_logging_token().await?;
        let (credential, ttl) = validate(issued, SystemTime::now(), self.margin)?;
        let credential = Arc::new(credential);
        if !self.cache.set(Arc::clone(&credential), ttl) {
            return Err(TokenError::Expired);
        }
        info!("Logging token set for: {ttl:?}");
        Ok(credential)
    }

    /// Project id carried by the most recently minted credential.
    #[must_use]
    pub fn project_id(&self) -> String {
        self.cache
            .entry()
            .map(|entry| entry.credential().project_id().to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn margin(&self) -> Duration {
        self.margin
    }
}

#[async_trait]
impl TokenSource for TokenManager {
    async fn token(&self) -> Result<Arc<Credential>, TokenError> {
        TokenManager::token(self).await
    }
}

/// Checks an issued token against `now` and returns the credential with its cache TTL.
pub fn validate(
    issued: IssuedToken,
    now: SystemTime,
    margin: Duration,
) -> Result<(Credential, Duration), TokenError> {
    if issued.token_value.is_empty() {
        return Err(TokenError::NoToken);
    }
    if issued.project_id.is_empty() {
        return Err(TokenError::MissingProject);
    }
    let expires_at = issued
        .expires_at()
        .filter(|expires_at| *expires_at > now)
        .ok_or(TokenError::Expired)?;
    let ttl = cache_ttl(expires_at, now, margin).ok_or(TokenError::Expired)?;
    Ok((
        Credential::new(issued.token_value, expires_at, issued.project_id),
        ttl,
    ))
}
