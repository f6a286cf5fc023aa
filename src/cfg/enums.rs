// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Transport family used to drive a CLI session.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Ssh,
    Telnet,
}
impl Default for TransportKind {
    fn default() -> Self {
        TransportKind::Ssh
    }
}
impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Ssh => "ssh",
            TransportKind::Telnet => "telnet",
        })
    }
}

/// Output shape for the host-info dump emitted after a run.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    #[default]
    Json,
    Yaml,
}

/// Broad device family recognized by the neighbor handler registry.
///
/// Distinct from `device_type`, which is the raw string a transport library
/// platform name uses; `DeviceFamily` is the coarser bucket the handler
/// registry dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    CiscoLike,
    HpLike,
    Unknown(String),
}
impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::CiscoLike => f.write_str("cisco-like"),
            DeviceFamily::HpLike => f.write_str("hp-like"),
            DeviceFamily::Unknown(s) => write!(f, "unknown({s})"),
        }
    }
}
