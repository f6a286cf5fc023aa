//! Credential parsing and the ordered credential store.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::Deserialize;
use tracing::warn;

use crate::{
    cfg::logger::TARGET_CORE,
    expr::{Delimiters, ParsedExpr, parse_expression},
};

/// Default delimiters for credential expressions: `:` separates
/// username/password/secret within one credential, `@` separates multiple
/// credentials packed into one token.
pub const CRED_DELIMS: Delimiters = Delimiters::new(':', '@');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub secret: String,
    pub device_type_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialFileEntry {
    username: String,
    password: Option<String>,
    secret: Option<String>,
    #[serde(rename = "type")]
    device_type: Option<String>,
}

impl From<CredentialFileEntry> for Credential {
    fn from(e: CredentialFileEntry) -> Self {
        let password = e.password.unwrap_or_else(|| e.username.clone());
        let secret = e.secret.unwrap_or_else(|| password.clone());
        Credential {
            username: e.username,
            password,
            secret,
            device_type_hint: e.device_type,
        }
    }
}

/// Ordered collection of credentials, in the order they were parsed.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    pub credentials: Vec<Credential>,
}

impl CredentialStore {
    /// One input token is one credential: the first entry (value-delimiter
    /// fields) is the username/password/secret triple, the optional second
    /// entry's first element is the device-type hint.
    pub fn parse(inputs: &[String]) -> Self {
        let parsed = parse_expression(inputs, CRED_DELIMS);
        let mut credentials = Vec::new();
        for p in parsed {
            match p {
                ParsedExpr::String(entries) => {
                    if let Some(c) = credential_from_entries(&entries) {
                        credentials.push(c);
                    }
                },
                ParsedExpr::File(value) => {
                    credentials.extend(credentials_from_file_value(value));
                },
            }
        }
        CredentialStore { credentials }
    }
}

fn credential_from_entries(entries: &[Vec<String>]) -> Option<Credential> {
    let fields = entries.first()?;
    if fields.is_empty() || fields[0].is_empty() {
        warn!(target: TARGET_CORE, "empty credential entry");
        return None;
    }
    let (username, password, secret) = match fields.len() {
        1 => (fields[0].clone(), fields[0].clone(), fields[0].clone()),
        2 => (fields[0].clone(), fields[1].clone(), fields[1].clone()),
        _ => (fields[0].clone(), fields[1].clone(), fields[2].clone()),
    };
    let device_type_hint = entries
        .get(1)
        .and_then(|hint| hint.first())
        .filter(|s| !s.is_empty())
        .cloned();
    Some(Credential {
        username,
        password,
        secret,
        device_type_hint,
    })
}

fn credentials_from_file_value(value: serde_yaml::Value) -> Vec<Credential> {
    let entries: Vec<CredentialFileEntry> = if value.is_sequence() {
        match serde_yaml::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: TARGET_CORE, error = %e, "malformed credential list in file");
                return Vec::new();
            },
        }
    } else {
        match serde_yaml::from_value::<CredentialFileEntry>(value) {
            Ok(v) => vec![v],
            Err(e) => {
                warn!(target: TARGET_CORE, error = %e, "malformed credential entry in file");
                return Vec::new();
            },
        }
    };
    entries.into_iter().map(Credential::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_field_entry_reuses_value_everywhere() {
        let store = CredentialStore::parse(&["admin".to_string()]);
        assert_eq!(store.credentials.len(), 1);
        let c = &store.credentials[0];
        assert_eq!(c.username, "admin");
        assert_eq!(c.password, "admin");
        assert_eq!(c.secret, "admin");
    }

    #[test]
    fn two_field_entry_defaults_secret_to_password() {
        let store = CredentialStore::parse(&["admin:s3cret".to_string()]);
        let c = &store.credentials[0];
        assert_eq!(c.password, "s3cret");
        assert_eq!(c.secret, "s3cret");
    }

    #[test]
    fn three_field_entry_keeps_all_distinct() {
        let store = CredentialStore::parse(&["admin:s3cret:enable1".to_string()]);
        let c = &store.credentials[0];
        assert_eq!(c.username, "admin");
        assert_eq!(c.password, "s3cret");
        assert_eq!(c.secret, "enable1");
    }

    #[test]
    fn entry_delimiter_carries_device_type_hint() {
        let store = CredentialStore::parse(&["alice:hunter2@router_os".to_string()]);
        assert_eq!(store.credentials.len(), 1);
        let c = &store.credentials[0];
        assert_eq!(c.username, "alice");
        assert_eq!(c.password, "hunter2");
        assert_eq!(c.device_type_hint.as_deref(), Some("router_os"));
    }

    #[test]
    fn repeated_tokens_each_yield_one_credential() {
        let store = CredentialStore::parse(&["bob:pw2".to_string(), "alice:pw1@router_os".to_string()]);
        assert_eq!(store.credentials.len(), 2);
        assert_eq!(store.credentials[0].username, "bob");
        assert_eq!(store.credentials[1].username, "alice");
    }

    #[test]
    fn delimiter_override_cue_matches_spec_example() {
        // S3: `;$--alice;pw;enable$router_os` with value=';' entry='$'.
        let store = CredentialStore::parse(&[";$--alice;pw;enable$router_os".to_string()]);
        assert_eq!(store.credentials.len(), 1);
        let c = &store.credentials[0];
        assert_eq!(c.username, "alice");
        assert_eq!(c.password, "pw");
        assert_eq!(c.secret, "enable");
        assert_eq!(c.device_type_hint.as_deref(), Some("router_os"));
    }
}
