//! Cisco-like LLDP/CDP "show neighbors detail" screen-scraper.
//!
//! Parses the block-delimited text Cisco IOS/IOS-XE/NX-OS print for
//! `show lldp neighbors detail` and `show cdp neighbors detail`. This is a
//! worked reference covering one representative output shape per protocol,
//! not every firmware revision.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    connectors::{BoxFuture, Transport},
    neighbors::{handlers::NeighborExtract, model::NeighborRecord},
};

const BLOCK_DELIM: &str = "------------------------------------------------";

fn field(re: &Lazy<Regex>, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

static LLDP_SYSNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^System Name:\s*(.+)$").expect("static regex"));
static LLDP_SYSDESC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^System Description:\s*\n?(.+?)\n\S").expect("static regex"));
static LLDP_LOCALIF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Local Intf:\s*(.+)$").expect("static regex"));
static LLDP_REMOTEIF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Port id:\s*(.+)$").expect("static regex"));
static LLDP_REMOTEIFDESC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Port Description:\s*(.+)$").expect("static regex"));
static LLDP_TTL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Time remaining:\s*(\d+)").expect("static regex"));
static LLDP_SYSCAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^System Capabilities:\s*(.+)$").expect("static regex"));
static LLDP_MGMTADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Management Address:\s*(.+)$").expect("static regex"));
static LLDP_CHASSIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Chassis id:\s*(.+)$").expect("static regex"));

fn split_caps(s: &str) -> Vec<String> {
    s.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect()
}

fn parse_lldp_detail(text: &str) -> Vec<NeighborRecord> {
    text.split(BLOCK_DELIM)
        .filter_map(|block| {
            let sysname = field(&LLDP_SYSNAME, block);
            let localif = field(&LLDP_LOCALIF, block);
            sysname.as_ref()?;
            localif.as_ref()?;
            let syscap = field(&LLDP_SYSCAP, block).map(|s| split_caps(&s)).unwrap_or_default();
            Some(NeighborRecord {
                sysid: field(&LLDP_CHASSIS, block).into_iter().collect(),
                remoteif: field(&LLDP_REMOTEIF, block).into_iter().collect(),
                ttl: field(&LLDP_TTL, block).into_iter().collect(),
                remoteifdesc: field(&LLDP_REMOTEIFDESC, block).into_iter().collect(),
                sysname: sysname.into_iter().collect(),
                sysdesc: field(&LLDP_SYSDESC, block).into_iter().collect(),
                syscap,
                addresses: field(&LLDP_MGMTADDR, block).into_iter().collect(),
                localif: localif.into_iter().collect(),
                platform: Vec::new(),
            })
        })
        .collect()
}

static CDP_DEVICEID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Device ID:\s*(.+)$").expect("static regex"));
static CDP_ENTRYADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*IP address:\s*(.+)$").expect("static regex"));
static CDP_PLATFORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Platform:\s*([^,]+),").expect("static regex"));
static CDP_CAPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Capabilities:\s*(.+)$").expect("static regex"));
static CDP_LOCALIF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^Interface:\s*([^,]+),\s*Port ID \(outgoing port\):\s*(.+)$")
        .expect("static regex")
});
static CDP_HOLDTIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)Holdtime\s*:\s*(\d+)").expect("static regex"));
static CDP_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^Version\s*:\s*\n?(.+?)\n\S").expect("static regex"));

fn parse_cdp_detail(text: &str) -> Vec<NeighborRecord> {
    text.split("-------------------------")
        .filter_map(|block| {
            let sysname = field(&CDP_DEVICEID, block)?;
            let localif_caps = CDP_LOCALIF.captures(block);
            let localif = localif_caps
                .as_ref()
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            let remoteif = localif_caps
                .as_ref()
                .and_then(|c| c.get(2))
                .map(|m| m.as_str().trim().to_string());
            Some(NeighborRecord {
                sysid: vec![sysname.clone()],
                remoteif: remoteif.into_iter().collect(),
                ttl: field(&CDP_HOLDTIME, block).into_iter().collect(),
                remoteifdesc: Vec::new(),
                sysname: vec![sysname],
                sysdesc: field(&CDP_VERSION, block).into_iter().collect(),
                syscap: field(&CDP_CAPS, block).map(|s| split_caps(&s)).unwrap_or_default(),
                addresses: field(&CDP_ENTRYADDR, block).into_iter().collect(),
                localif: localif.into_iter().collect(),
                platform: field(&CDP_PLATFORM, block).into_iter().collect(),
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
            let text = transport.interact("show lldp neighbors detail").await?;
            extract.lldp = parse_lldp_detail(&text);
        }
        if want_cdp {
            let text = transport.interact("show cdp neighbors detail").await?;
            extract.cdp = parse_cdp_detail(&text);
        }
        Ok(extract)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LLDP: &str = "\
------------------------------------------------
Local Intf: Gi0/1
Chassis id: aaaa.bbbb.cccc
Port id: Gi0/24
Port Description: uplink to core
System Name: core-sw1.example.net
System Description:
Cisco IOS Software, C3750
Time remaining: 98 seconds
System Capabilities: B, R
Management Address: 10.0.0.1
------------------------------------------------
Total entries displayed: 1
";

    #[test]
    fn parses_one_lldp_neighbor() {
        let got = parse_lldp_detail(SAMPLE_LLDP);
        assert_eq!(got.len(), 1);
        let n = &got[0];
        assert_eq!(n.sysname, vec!["core-sw1.example.net".to_string()]);
        assert_eq!(n.localif, vec!["Gi0/1".to_string()]);
        assert_eq!(n.remoteif, vec!["Gi0/24".to_string()]);
        assert_eq!(n.ttl, vec!["98".to_string()]);
        assert_eq!(n.syscap, vec!["B".to_string(), "R".to_string()]);
        assert_eq!(n.addresses, vec!["10.0.0.1".to_string()]);
    }
}
