// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Single-slot credential cache with lazy expiry.
//!
//! The slot holds an immutable [`CachedCredential`] behind an `Arc`; writers
//! replace the whole record, so readers either see the previous entry or the
//! new one. Expiry is checked on [`CredentialCache::get`], there is no
//! background eviction.

use crate::credential::Credential;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// A credential plus the deadline the cache enforces for it.
#[derive(Debug)]
pub struct CachedCredential {
    credential: Arc<Credential>,
    deadline: Instant,
}

impl CachedCredential {
    #[must_use]
    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

#[derive(Debug, Default)]
pub struct CredentialCache {
    slot: RwLock<Option<Arc<CachedCredential>>>,
}

impl CredentialCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached credential if one is stored and its deadline has not passed.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Credential>> {
        self.entry()
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| Arc::clone(&entry.credential))
    }

    /// Raw access to the stored entry, live or not.
    #[must_use]
    pub fn entry(&self) -> Option<Arc<CachedCredential>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    /// Stores `credential` for `ttl`. A zero `ttl` is rejected and leaves the
    /// slot untouched; returns whether the entry was stored.
    pub fn set(&self, credential: Arc<Credential>, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        let Some(deadline) = Instant::now().checked_add(ttl) else {
            return false;
        };
        let entry = Arc::new(CachedCredential {
            credential,
            deadline,
        });
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
        true
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Time a credential may stay cached: `expires_at - now - margin`.
///
/// Returns `None` when the result would be zero or negative, i.e. the
/// credential is already inside its safety margin.
#[must_use]
pub fn cache_ttl(expires_at: SystemTime, now: SystemTime, margin: Duration) -> Option<Duration> {
    let remaining = expires_at.duration_since(now).ok()?;
    remaining.checked_sub(margin).filter(|ttl| !ttl.is_zero())
}
