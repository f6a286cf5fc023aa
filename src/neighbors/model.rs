// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// The ten attributes every neighbor record carries, normalized across LLDP
/// and CDP. Each is a list rather than a scalar because a single neighbor
/// can legitimately advertise more than one value (e.g. several management
/// addresses).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborRecord {
    pub sysid: Vec<String>,
    pub remoteif: Vec<String>,
    pub ttl: Vec<String>,
    pub remoteifdesc: Vec<String>,
    pub sysname: Vec<String>,
    pub sysdesc: Vec<String>,
    pub syscap: Vec<String>,
    pub addresses: Vec<String>,
    pub localif: Vec<String>,
    pub platform: Vec<String>,
}

/// Static per-attribute metadata (LLDP/CDP TLV identity, human
/// description). Deliberately excluded from `NeighborRecord` itself so it
/// never participates in equality.
pub struct AttributeMeta {
    pub name: &'static str,
    pub lldp_tlv_type: Option<u8>,
    pub lldp_tlv_name: Option<&'static str>,
    pub cdp_tlv_type: Option<u16>,
    pub cdp_tlv_name: Option<&'static str>,
    pub description: &'static str,
}

pub const ATTRIBUTE_META: &[AttributeMeta] = &[
    AttributeMeta {
        name: "sysid",
        lldp_tlv_type: Some(1),
        lldp_tlv_name: Some("Chassis ID"),
        cdp_tlv_type: Some(0x0001),
        cdp_tlv_name: Some("Device ID"),
        description: "Chassis/device identifier of the neighbor",
    },
    AttributeMeta {
        name: "remoteif",
        lldp_tlv_type: Some(2),
        lldp_tlv_name: Some("Port ID"),
        cdp_tlv_type: Some(0x0003),
        cdp_tlv_name: Some("Port ID"),
        description: "Neighbor's interface facing the local device",
    },
    AttributeMeta {
        name: "ttl",
        lldp_tlv_type: Some(3),
        lldp_tlv_name: Some("Time To Live"),
        cdp_tlv_type: None,
        cdp_tlv_name: Some("Holdtime"),
        description: "Seconds before this advertisement expires",
    },
    AttributeMeta {
        name: "remoteifdesc",
        lldp_tlv_type: Some(4),
        lldp_tlv_name: Some("Port Description"),
        cdp_tlv_type: None,
        cdp_tlv_name: None,
        description: "Free-text description of the neighbor's interface",
    },
    AttributeMeta {
        name: "sysname",
        lldp_tlv_type: Some(5),
        lldp_tlv_name: Some("System Name"),
        cdp_tlv_type: Some(0x0001),
        cdp_tlv_name: Some("Device ID"),
        description: "Neighbor's configured hostname",
    },
    AttributeMeta {
        name: "sysdesc",
        lldp_tlv_type: Some(6),
        lldp_tlv_name: Some("System Description"),
        cdp_tlv_type: Some(0x0006),
        cdp_tlv_name: Some("Software Version"),
        description: "Free-text platform/software description",
    },
    AttributeMeta {
        name: "syscap",
        lldp_tlv_type: Some(7),
        lldp_tlv_name: Some("System Capabilities"),
        cdp_tlv_type: Some(0x0004),
        cdp_tlv_name: Some("Capabilities"),
        description: "Advertised capability flags (router, switch, etc.)",
    },
    AttributeMeta {
        name: "addresses",
        lldp_tlv_type: Some(8),
        lldp_tlv_name: Some("Management Address"),
        cdp_tlv_type: Some(0x0002),
        cdp_tlv_name: Some("Address"),
        description: "Management addresses reachable on the neighbor",
    },
    AttributeMeta {
        name: "localif",
        lldp_tlv_type: None,
        lldp_tlv_name: None,
        cdp_tlv_type: None,
        cdp_tlv_name: None,
        description: "Local interface this neighbor was heard on",
    },
    AttributeMeta {
        name: "platform",
        lldp_tlv_type: None,
        lldp_tlv_name: None,
        cdp_tlv_type: Some(0x0006),
        cdp_tlv_name: Some("Platform"),
        description: "Neighbor's hardware/platform identity",
    },
];

pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "sysid",
    "remoteif",
    "ttl",
    "remoteifdesc",
    "sysname",
    "sysdesc",
    "syscap",
    "addresses",
    "localif",
    "platform",
];

impl NeighborRecord {
    pub fn get(&self, attribute: &str) -> Option<&[String]> {
        Some(match attribute {
            "sysid" => &self.sysid,
            "remoteif" => &self.remoteif,
            "ttl" => &self.ttl,
            "remoteifdesc" => &self.remoteifdesc,
            "sysname" => &self.sysname,
            "sysdesc" => &self.sysdesc,
            "syscap" => &self.syscap,
            "addresses" => &self.addresses,
            "localif" => &self.localif,
            "platform" => &self.platform,
            _ => return None,
        })
    }

    fn get_mut(&mut self, attribute: &str) -> Option<&mut Vec<String>> {
        Some(match attribute {
            "sysid" => &mut self.sysid,
            "remoteif" => &mut self.remoteif,
            "ttl" => &mut self.ttl,
            "remoteifdesc" => &mut self.remoteifdesc,
            "sysname" => &mut self.sysname,
            "sysdesc" => &mut self.sysdesc,
            "syscap" => &mut self.syscap,
            "addresses" => &mut self.addresses,
            "localif" => &mut self.localif,
            "platform" => &mut self.platform,
            _ => return None,
        })
    }

    /// Renders the record as the free-form JSON shape stashed into
    /// `host.info["neighbors"]` for the dump toggle.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(ALLOWED_ATTRIBUTES.len());
        for attr in ALLOWED_ATTRIBUTES {
            #[allow(clippy::unwrap_used)]
            let values = self.get(attr).unwrap();
            map.insert(attr.to_string(), serde_json::Value::from(values.to_vec()));
        }
        serde_json::Value::Object(map)
    }

    /// Fills any attribute that is empty in `self` with `other`'s value for
    /// that attribute, e.g. merging an LLDP-brief pass's `localif` into an
    /// LLDP-detail record that omitted it. `self`'s non-empty values always
    /// win.
    pub fn merge_missing_from(&mut self, other: &NeighborRecord) {
        for meta in ATTRIBUTE_META {
            if let Some(slot) = self.get_mut(meta.name)
                && slot.is_empty()
                && let Some(src) = other.get(meta.name)
            {
                slot.extend(src.iter().cloned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_missing_from_fills_only_empty_attributes() {
        let mut a = NeighborRecord {
            sysname: vec!["sw1".into()],
            ..Default::default()
        };
        let b = NeighborRecord {
            sysname: vec!["other".into()],
            localif: vec!["Gi0/1".into()],
            ..Default::default()
        };
        a.merge_missing_from(&b);
        assert_eq!(a.sysname, vec!["sw1".to_string()]);
        assert_eq!(a.localif, vec!["Gi0/1".to_string()]);
    }
}
