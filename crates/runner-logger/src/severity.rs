// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::record::LogLevel;
use serde::Serialize;

/// Cloud Logging severity. Discriminants follow the `LogSeverity` enum of the
/// Cloud Logging API so ordering comparisons match the service's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Default = 0,
    Debug = 100,
    Info = 200,
    Notice = 300,
    Warning = 400,
    Error = 500,
    Critical = 600,
    Alert = 700,
    Emergency = 800,
}

#[must_use]
pub fn map_level(level: LogLevel) -> Severity {
    match level {
        LogLevel::Trace | LogLevel::Debug => Severity::Debug,
        LogLevel::Info => Severity::Info,
        LogLevel::Warn => Severity::Warning,
        LogLevel::Error => Severity::Error,
        LogLevel::Fatal | LogLevel::Panic => Severity::Critical,
    }
}

/// Maps a textual level name; names that are not a known level map to
/// [`Severity::Default`].
#[must_use]
pub fn map_level_name(name: &str) -> Severity {
    name.parse::<LogLevel>()
        .map(map_level)
        .unwrap_or(Severity::Default)
}
