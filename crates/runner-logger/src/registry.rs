// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide active logger.
//!
//! The slot holds an `Arc<Logger>`; [`current`] clones the `Arc` under a read
//! lock and releases the lock before any I/O happens, [`replace`] swaps the
//! `Arc` under the write lock. Readers therefore see either the old or the new
//! logger, never a partially built one.
//!
//! Code that prefers explicit handles can build a [`Logger`] and pass it
//! around; this registry only provides the process default.

use crate::logger::Logger;
use crate::record::{LogLevel, LogRecord};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

fn slot() -> &'static RwLock<Arc<Logger>> {
    static ACTIVE: OnceLock<RwLock<Arc<Logger>>> = OnceLock::new();
    ACTIVE.get_or_init(|| RwLock::new(Arc::new(Logger::default())))
}

/// Returns the active logger.
#[must_use]
pub fn current() -> Arc<Logger> {
    Arc::clone(&slot().read().unwrap_or_else(PoisonError::into_inner))
}

/// Installs `logger` as the active logger and returns the one it replaced.
pub fn replace(logger: Logger) -> Arc<Logger> {
    replace_arc(Arc::new(logger))
}

pub fn replace_arc(logger: Arc<Logger>) -> Arc<Logger> {
    let mut active = slot().write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *active, logger)
}

/// Sends `record` to the active logger.
pub fn log(record: LogRecord) {
    current().log(record);
}

#[track_caller]
pub fn trace(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Trace, message));
}

#[track_caller]
pub fn debug(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Debug, message));
}

#[track_caller]
pub fn info(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Info, message));
}

#[track_caller]
pub fn warn(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Warn, message));
}

#[track_caller]
pub fn error(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Error, message));
}

/// Logs at fatal level. The process keeps running.
#[track_caller]
pub fn fatal(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Fatal, message));
}

/// Logs at panic level. Does not unwind.
#[track_caller]
pub fn panic(message: impl Into<String>) {
    log(LogRecord::new(LogLevel::Panic, message));
}
