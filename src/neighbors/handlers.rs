//! Device-family-dispatched neighbor extraction.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use anyhow::Result;
use regex::Regex;

use crate::{
    cfg::enums::DeviceFamily,
    connectors::{BoxFuture, Transport},
    neighbors::{cisco, hp, model::NeighborRecord},
};

#[derive(Debug, Default, Clone)]
pub struct NeighborExtract {
    pub lldp: Vec<NeighborRecord>,
    pub cdp: Vec<NeighborRecord>,
}

/// A per-connector neighbor scraper: given a live session and which
/// protocols the caller wants, returns the neighbors observed over each.
pub type HandlerFn = for<'a> fn(&'a dyn Transport, bool, bool) -> BoxFuture<'a, Result<NeighborExtract>>;

pub struct HandlerEntry {
    pub device_family: DeviceFamily,
    pub handlers: HashMap<&'static str, HandlerFn>,
}

/// Recognizes the coarse `DeviceFamily` a raw `device_type` string belongs
/// to: an ordered list of regexes, first match wins. This is the one place
/// the type string is re-scanned; everything downstream (handler selection)
/// dispatches on the resulting enum with a `match`, not another regex scan.
struct Recognizer {
    family: DeviceFamily,
    patterns: Vec<Regex>,
}

/// An ordered list of `{type_patterns, handlers}` entries; the first entry
/// whose pattern matches a host's `device_type` is used (entry order
/// matters when patterns overlap).
pub struct HandlerRegistry {
    recognizers: Vec<Recognizer>,
    entries: HashMap<DeviceFamily, HandlerEntry>,
}

impl HandlerRegistry {
    /// The two worked-example device families this crate ships scrapers
    /// for.
    pub fn builtin() -> Self {
        let cisco_patterns = [".*cisco.*", ".*ios.*", ".*nxos.*", ".*eos.*"]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        let mut cisco_handlers: HashMap<&'static str, HandlerFn> = HashMap::new();
        cisco_handlers.insert("cli", cisco::handler);

        let hp_patterns = [".*hp.*", ".*procurve.*", ".*aruba.*", ".*comware.*"]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        let mut hp_handlers: HashMap<&'static str, HandlerFn> = HashMap::new();
        hp_handlers.insert("cli", hp::handler);

        let mut entries = HashMap::new();
        entries.insert(DeviceFamily::CiscoLike, HandlerEntry {
            device_family: DeviceFamily::CiscoLike,
            handlers: cisco_handlers,
        });
        entries.insert(DeviceFamily::HpLike, HandlerEntry {
            device_family: DeviceFamily::HpLike,
            handlers: hp_handlers,
        });

        HandlerRegistry {
            recognizers: vec![
                Recognizer { family: DeviceFamily::CiscoLike, patterns: cisco_patterns },
                Recognizer { family: DeviceFamily::HpLike, patterns: hp_patterns },
            ],
            entries,
        }
    }

    /// Recognizes the `DeviceFamily` for a raw device-type string; the
    /// first recognizer whose pattern list matches wins.
    pub fn recognize(&self, device_type: &str) -> DeviceFamily {
        self.recognizers
            .iter()
            .find(|r| r.patterns.iter().any(|p| p.is_match(device_type)))
            .map(|r| r.family.clone())
            .unwrap_or_else(|| DeviceFamily::Unknown(device_type.to_string()))
    }

    pub fn lookup(&self, device_type: &str) -> Option<&HandlerEntry> {
        match self.recognize(device_type) {
            DeviceFamily::Unknown(_) => None,
            family => self.entries.get(&family),
        }
    }
}
