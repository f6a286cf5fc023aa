// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::Deserialize;
use tracing::warn;

use crate::{
    cfg::logger::TARGET_CORE,
    expr::{Delimiters, ParsedExpr, parse_expression},
};

/// Default delimiters for address expressions: `:` separates address/port
/// within the first entry, `@` separates that entry from an optional
/// second entry carrying the device-type hint.
pub const ADDRESS_DELIMS: Delimiters = Delimiters::new(':', '@');

/// An address record's address field: either one literal address, or a list
/// of alternates (as advertised by a neighbor with multiple management
/// addresses). The connector tries alternates in order and narrows to the
/// first that succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddressValue {
    Single(String),
    Alternates(Vec<String>),
}

impl AddressValue {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            AddressValue::Single(s) => std::slice::from_ref(s).iter().map(String::as_str),
            AddressValue::Alternates(v) => v.iter().map(String::as_str),
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.iter().next()
    }
}

/// The canonical input record describing one host to connect to. This is
/// also the deduplication key the Host Registry hashes on: two records are
/// the same host only if address, port, and device_type all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressRecord {
    pub address: AddressValue,
    pub port: Option<u16>,
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddressFileValue {
    Single(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct AddressFileEntry {
    address: AddressFileValue,
    port: Option<u16>,
    #[serde(rename = "type")]
    device_type: Option<String>,
}

impl From<AddressFileEntry> for AddressRecord {
    fn from(e: AddressFileEntry) -> Self {
        let address = match e.address {
            AddressFileValue::Single(s) => AddressValue::Single(s),
            AddressFileValue::List(v) => AddressValue::Alternates(v),
        };
        AddressRecord {
            address,
            port: e.port,
            device_type: e.device_type,
        }
    }
}

/// One input token is one address record: the first entry (value-delimiter
/// fields) carries `address[:port]`, the optional second entry's first
/// element is the device-type hint. Mirrors the credential expression
/// grammar in `creds`.
pub fn parse_addresses(inputs: &[String]) -> Vec<AddressRecord> {
    let parsed = parse_expression(inputs, ADDRESS_DELIMS);
    let mut out = Vec::new();
    for p in parsed {
        match p {
            ParsedExpr::String(entries) => {
                if let Some(rec) = address_from_entries(&entries) {
                    out.push(rec);
                }
            },
            ParsedExpr::File(value) => out.extend(addresses_from_file_value(value)),
        }
    }
    out
}

fn address_from_entries(entries: &[Vec<String>]) -> Option<AddressRecord> {
    let fields = entries.first()?;
    if fields.is_empty() || fields[0].is_empty() {
        warn!(target: TARGET_CORE, "empty address entry");
        return None;
    }
    let port = fields
        .get(1)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<u16>().ok());
    let device_type = entries
        .get(1)
        .and_then(|hint| hint.first())
        .filter(|s| !s.is_empty())
        .cloned();
    Some(AddressRecord {
        address: AddressValue::Single(fields[0].clone()),
        port,
        device_type,
    })
}

fn addresses_from_file_value(value: serde_yaml::Value) -> Vec<AddressRecord> {
    let entries: Vec<AddressFileEntry> = if value.is_sequence() {
        match serde_yaml::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: TARGET_CORE, error = %e, "malformed address list in file");
                return Vec::new();
            },
        }
    } else {
        match serde_yaml::from_value::<AddressFileEntry>(value) {
            Ok(v) => vec![v],
            Err(e) => {
                warn!(target: TARGET_CORE, error = %e, "malformed address entry in file");
                return Vec::new();
            },
        }
    };
    entries.into_iter().map(AddressRecord::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_host_with_type() {
        let out = parse_addresses(&["10.0.0.1:22@cisco_ios".to_string()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, AddressValue::Single("10.0.0.1".to_string()));
        assert_eq!(out[0].port, Some(22));
        assert_eq!(out[0].device_type.as_deref(), Some("cisco_ios"));
    }

    #[test]
    fn bare_host_has_no_port_or_type() {
        let out = parse_addresses(&["switch1".to_string()]);
        assert_eq!(out[0].port, None);
        assert_eq!(out[0].device_type, None);
    }

    #[test]
    fn entry_delimiter_carries_device_type_hint() {
        let out = parse_addresses(&["192.0.2.10@router_os".to_string()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, AddressValue::Single("192.0.2.10".to_string()));
        assert_eq!(out[0].device_type.as_deref(), Some("router_os"));
    }
}
