//! Normalizes heterogeneous CLI tokens (literal expressions or files) into a
//! uniform tagged record.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::Path;

use tracing::warn;

use crate::cfg::logger::TARGET_CORE;

/// Delimiter pair used to split a string expression: `value` splits a single
/// entry into its fields, `entry` splits the payload into entries.
#[derive(Debug, Clone, Copy)]
pub struct Delimiters {
    pub value: char,
    pub entry: char,
}

impl Delimiters {
    pub const fn new(value: char, entry: char) -> Self {
        Delimiters { value, entry }
    }
}

/// The literal two-character sentinel that must follow an override cue's
/// value/entry delimiter pair, e.g. `VE--` in `VE--host1:admin@host2:guest`.
const OVERRIDE_SENTINEL: &str = "--";

/// One parsed input token: either a decoded file's structured contents, or a
/// string expression split into entries of fields.
#[derive(Debug, Clone)]
pub enum ParsedExpr {
    File(serde_yaml::Value),
    String(Vec<Vec<String>>),
}

/// Parses every token in `inputs`, skipping (with a warning) any token that
/// cannot be interpreted as either an existing file or a well-formed string
/// expression under `defaults`.
pub fn parse_expression(inputs: &[String], defaults: Delimiters) -> Vec<ParsedExpr> {
    inputs
        .iter()
        .filter_map(|tok| parse_one(tok, defaults))
        .collect()
}

fn parse_one(token: &str, defaults: Delimiters) -> Option<ParsedExpr> {
    if Path::new(token).is_file() {
        return parse_file(token);
    }
    parse_str(token, defaults)
}

fn parse_file(path: &str) -> Option<ParsedExpr> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(target: TARGET_CORE, %path, error = %e, "failed to read expression file");
            return None;
        },
    };
    if let Ok(v) = serde_yaml::from_str::<serde_yaml::Value>(&contents) {
        return Some(ParsedExpr::File(v));
    }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(&contents) {
        let v: serde_yaml::Value =
            serde_yaml::to_value(v).ok().unwrap_or(serde_yaml::Value::Null);
        return Some(ParsedExpr::File(v));
    }
    warn!(target: TARGET_CORE, %path, "could not decode expression file as YAML or JSON");
    None
}

fn parse_str(token: &str, defaults: Delimiters) -> Option<ParsedExpr> {
    let (delims, payload) = split_override_cue(token, defaults)?;
    if payload.is_empty() {
        warn!(target: TARGET_CORE, %token, "empty expression after delimiter override cue");
        return None;
    }
    let entries = payload
        .split(delims.entry)
        .map(|entry| entry.split(delims.value).map(str::to_string).collect())
        .collect();
    Some(ParsedExpr::String(entries))
}

/// Recognizes the optional `VE--REST` override cue: `V` becomes the value
/// delimiter, `E` the entry delimiter, and the literal `--` sentinel must
/// follow for the cue to take effect. Returns the effective delimiters and
/// the remaining payload.
fn split_override_cue<'a>(token: &'a str, defaults: Delimiters) -> Option<(Delimiters, &'a str)> {
    let bytes = token.as_bytes();
    if token.len() > 4 && bytes[2] == OVERRIDE_SENTINEL.as_bytes()[0] && bytes[3] == OVERRIDE_SENTINEL.as_bytes()[1]
    {
        let value = bytes[0] as char;
        let entry = bytes[1] as char;
        return Some((Delimiters::new(value, entry), &token[4..]));
    }
    Some((defaults, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST_DELIMS: Delimiters = Delimiters::new(':', '@');

    #[test]
    fn plain_string_uses_default_delimiters() {
        let out = parse_expression(
            &["host1:22@host2:23".to_string()],
            HOST_DELIMS,
        );
        assert_eq!(out.len(), 1);
        match &out[0] {
            ParsedExpr::String(entries) => {
                assert_eq!(entries, &vec![
                    vec!["host1".to_string(), "22".to_string()],
                    vec!["host2".to_string(), "23".to_string()],
                ]);
            },
            _ => panic!("expected string expression"),
        }
    }

    #[test]
    fn override_cue_changes_delimiters() {
        let out = parse_expression(&[";,--host1;22,host2;23".to_string()], HOST_DELIMS);
        match &out[0] {
            ParsedExpr::String(entries) => {
                assert_eq!(entries, &vec![
                    vec!["host1".to_string(), "22".to_string()],
                    vec!["host2".to_string(), "23".to_string()],
                ]);
            },
            _ => panic!("expected string expression"),
        }
    }

    #[test]
    fn nonexistent_file_like_token_falls_back_to_string() {
        let out = parse_expression(&["/no/such/file.yaml".to_string()], HOST_DELIMS);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], ParsedExpr::String(_)));
    }
}
