// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::creds::Credential;

/// Sentinel device-type value meaning "detect the platform at connect time".
pub const AUTODETECT: &str = "autodetect";

/// The platform library's recognized device types, in the order autodetect
/// and credential-ordering prefer them. A real deployment would draw this
/// from the transport library's platform table; this crate fixes a
/// representative list covering the two reference neighbor-handler families
/// plus a few common adjacent platforms.
pub const KNOWN_PLATFORMS: &[&str] = &[
    "cisco_ios",
    "cisco_xe",
    "cisco_nxos",
    "cisco_asa",
    "arista_eos",
    "hp_procurve",
    "hp_comware",
    "aruba_os",
    "juniper_junos",
];

pub fn is_known_platform(device_type: &str) -> bool {
    KNOWN_PLATFORMS.contains(&device_type)
}

/// Resolves the device type a connect attempt should use: the host's
/// declared type if it is a recognized platform, else the credential's
/// hint if recognized, else the autodetect sentinel.
pub fn resolve_effective_device_type(
    host_type: Option<&str>,
    credential_hint: Option<&str>,
) -> String {
    if let Some(t) = host_type
        && is_known_platform(t)
    {
        return t.to_string();
    }
    if let Some(h) = credential_hint
        && is_known_platform(h)
    {
        return h.to_string();
    }
    AUTODETECT.to_string()
}

/// Orders `credentials` for a connect attempt against a host of the given
/// (possibly unknown) device type:
///
/// - Tier A: credentials whose hint is in `[host_device_type, ...known
///   platforms in catalog order]` (deduped), grouped by that list's order.
/// - Tier B: credentials with no hint.
/// - Tier C: credentials whose hint exists but matches no preference entry.
pub fn order_credentials(
    credentials: &[Credential],
    host_device_type: Option<&str>,
) -> Vec<Credential> {
    let mut preference: Vec<&str> = Vec::with_capacity(KNOWN_PLATFORMS.len() + 1);
    if let Some(t) = host_device_type
        && !preference.contains(&t)
    {
        preference.push(t);
    }
    for p in KNOWN_PLATFORMS {
        if !preference.contains(p) {
            preference.push(p);
        }
    }

    let mut tier_a = Vec::new();
    for pref in &preference {
        for c in credentials {
            if c.device_type_hint.as_deref() == Some(*pref) {
                tier_a.push(c.clone());
            }
        }
    }

    let mut tier_b = Vec::new();
    let mut tier_c = Vec::new();
    for c in credentials {
        match &c.device_type_hint {
            None => tier_b.push(c.clone()),
            Some(hint) => {
                if !preference.contains(&hint.as_str()) {
                    tier_c.push(c.clone());
                }
            },
        }
    }

    tier_a.into_iter().chain(tier_b).chain(tier_c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(user: &str, hint: Option<&str>) -> Credential {
        Credential {
            username: user.to_string(),
            password: user.to_string(),
            secret: user.to_string(),
            device_type_hint: hint.map(str::to_string),
        }
    }

    #[test]
    fn tier_a_before_b_before_c() {
        let creds = vec![
            cred("untyped", None),
            cred("wrong_type", Some("mikrotik")),
            cred("right_type", Some("cisco_ios")),
        ];
        let ordered = order_credentials(&creds, Some("cisco_ios"));
        let names: Vec<_> = ordered.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["right_type", "untyped", "wrong_type"]);
    }

    #[test]
    fn resolve_prefers_host_type_over_hint() {
        let t = resolve_effective_device_type(Some("cisco_ios"), Some("hp_procurve"));
        assert_eq!(t, "cisco_ios");
    }

    #[test]
    fn resolve_falls_back_to_autodetect() {
        let t = resolve_effective_device_type(None, Some("not_a_real_platform"));
        assert_eq!(t, AUTODETECT);
    }

    #[test]
    fn resolve_uses_unknown_credential_hint_only_if_known() {
        let t = resolve_effective_device_type(None, Some("hp_procurve"));
        assert_eq!(t, "hp_procurve");
    }
}
