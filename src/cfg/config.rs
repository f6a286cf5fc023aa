// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::cfg::{enums::TransportKind, error::EngineError};

/// Engine-wide runtime knobs that are not tied to any single module.
///
/// Loaded from an optional YAML file (`--config`); every field also has a
/// default so the engine runs with no file at all.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct EngineSettings {
    /// Worker count for each connector's connect pool.
    #[serde(rename = "WorkerPoolSize")]
    pub worker_pool_size: usize,

    /// Worker count for the crawl orchestrator's pool.
    #[serde(rename = "CrawlPoolSize")]
    pub crawl_pool_size: usize,

    /// Default per-attempt transport timeout, in seconds.
    #[serde(rename = "ConnectTimeout", with = "serde_secs")]
    pub connect_timeout: Duration,

    /// Default transport family, overridable per-run via `--transport`.
    #[serde(rename = "Transport")]
    pub transport: TransportKind,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            worker_pool_size: 10,
            crawl_pool_size: 10,
            connect_timeout: Duration::from_secs(30),
            transport: TransportKind::Ssh,
        }
    }
}

impl EngineSettings {
    /// Loads settings from YAML, validates them, and returns the ready-to-use
    /// value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().display().to_string();
        let load = || -> anyhow::Result<Self> {
            let s = fs::read_to_string(&path)?;
            let mut cfg: EngineSettings = serde_yaml::from_str(&s)?;
            cfg.validate_and_normalize()?;
            Ok(cfg)
        };
        load().map_err(|source| EngineError::SettingsLoad { path: path_str, source }.into())
    }

    /// Validates invariants; there are no derived fields to normalize today,
    /// but the method mirrors the load-then-validate shape used elsewhere so
    /// future fields have an obvious home.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        if self.worker_pool_size < 1 {
            return Err(EngineError::InvalidSettings("WorkerPoolSize must be >= 1".to_string()).into());
        }
        if self.crawl_pool_size < 1 {
            return Err(EngineError::InvalidSettings("CrawlPoolSize must be >= 1".to_string()).into());
        }
        if self.connect_timeout.is_zero() {
            return Err(EngineError::InvalidSettings("ConnectTimeout must be > 0".to_string()).into());
        }
        Ok(())
    }
}

mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let mut s = EngineSettings::default();
        assert!(s.validate_and_normalize().is_ok());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut s = EngineSettings {
            worker_pool_size: 0,
            ..EngineSettings::default()
        };
        assert!(s.validate_and_normalize().is_err());
    }
}
