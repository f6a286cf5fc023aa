//! Top-level startup faults: the only errors this crate treats as fatal to
//! the whole run rather than local to one Host (§7).

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load engine settings from {path}: {source}")]
    SettingsLoad {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    LogFileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine settings invalid: {0}")]
    InvalidSettings(String),
}
