//! HP/Aruba-family LLDP/CDP neighbor screen-scraper.
//!
//! HP ProCurve/Comware and Aruba CLIs print neighbor detail as flat
//! `Key : Value` stanzas separated by blank lines rather than Cisco's
//! delimiter-line blocks, so this handler parses on blank-line boundaries.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;

use crate::{
    connectors::{BoxFuture, Transport},
    neighbors::{handlers::NeighborExtract, model::NeighborRecord},
};

fn kv_lookup<'a>(stanza: &'a str, key: &str) -> Option<&'a str> {
    stanza.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim().eq_ignore_ascii_case(key)).then(|| v.trim())
    })
}

fn stanzas(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").map(str::trim).filter(|s| !s.is_empty())
}

fn parse_lldp_stanzas(text: &str) -> Vec<NeighborRecord> {
    stanzas(text)
        .filter_map(|stanza| {
            let sysname = kv_lookup(stanza, "System Name")?;
            let localif = kv_lookup(stanza, "Local Port")?;
            Some(NeighborRecord {
                sysid: kv_lookup(stanza, "Chassis Id").map(str::to_string).into_iter().collect(),
                remoteif: kv_lookup(stanza, "Port Id").map(str::to_string).into_iter().collect(),
                ttl: kv_lookup(stanza, "TTL").map(str::to_string).into_iter().collect(),
                remoteifdesc: kv_lookup(stanza, "Port Description")
                    .map(str::to_string)
                    .into_iter()
                    .collect(),
                sysname: vec![sysname.to_string()],
                sysdesc: kv_lookup(stanza, "System Description")
                    .map(str::to_string)
                    .into_iter()
                    .collect(),
                syscap: kv_lookup(stanza, "System Capabilities")
                    .map(|s| s.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
                    .unwrap_or_default(),
                addresses: kv_lookup(stanza, "Address").map(str::to_string).into_iter().collect(),
                localif: vec![localif.to_string()],
                platform: Vec::new(),
            })
        })
        .collect()
}

fn parse_cdp_stanzas(text: &str) -> Vec<NeighborRecord> {
    stanzas(text)
        .filter_map(|stanza| {
            let sysname = kv_lookup(stanza, "Device ID")?;
            Some(NeighborRecord {
                sysid: vec![sysname.to_string()],
                remoteif: kv_lookup(stanza, "Port ID").map(str::to_string).into_iter().collect(),
                ttl: kv_lookup(stanza, "Holdtime").map(str::to_string).into_iter().collect(),
                remoteifdesc: Vec::new(),
                sysname: vec![sysname.to_string()],
                sysdesc: kv_lookup(stanza, "Software Version")
                    .map(str::to_string)
                    .into_iter()
                    .collect(),
                syscap: kv_lookup(stanza, "Capability")
                    .map(|s| s.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
                    .unwrap_or_default(),
                addresses: kv_lookup(stanza, "Address").map(str::to_string).into_iter().collect(),
                localif: kv_lookup(stanza, "Interface").map(str::to_string).into_iter().collect(),
                platform: kv_lookup(stanza, "Platform").map(str::to_string).into_iter().collect(),
            })
        })
        .collect()
}

pub fn handler(
    transport: &dyn Transport,
    want_lldp: bool,
    want_cdp: bool,
) -> BoxFuture<'_, Result<NeighborExtract>> {
    Box::pin(async move {
        let mut extract = NeighborExtract::default();
        if want_lldp {
            let text = transport.interact("show lldp info remote-device detail").await?;
            extract.lldp = parse_lldp_stanzas(&text);
        }
        if want_cdp {
            let text = transport.interact("show cdp neighbors detail").await?;
            extract.cdp = parse_cdp_stanzas(&text);
        }
        Ok(extract)
    })
}
