//! OR-of-ANDs filter expressions over neighbor records.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use regex::Regex;
use tracing::warn;

use crate::{
    cfg::logger::TARGET_CORE,
    expr::{Delimiters, ParsedExpr, parse_expression},
    neighbors::model::{ALLOWED_ATTRIBUTES, NeighborRecord},
};

/// Default delimiters for filter expressions: `:` separates
/// attribute/regex within one atom, `%` separates multiple atoms packed
/// into one token (each becomes its own filter-set/conjunction).
pub const FILTER_DELIMS: Delimiters = Delimiters::new(':', '%');

#[derive(Debug, Clone)]
pub struct FilterAtom {
    pub attribute: String,
    pub regex: Regex,
}

impl FilterAtom {
    fn matches(&self, n: &NeighborRecord) -> bool {
        match n.get(&self.attribute) {
            Some(values) => values.iter().any(|v| self.regex.is_match(v)),
            None => false,
        }
    }
}

/// A conjunction: every atom must match for the set to pass.
pub type FilterSet = Vec<FilterAtom>;

/// A disjunction of filter-sets. An empty filter accepts every neighbor.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub sets: Vec<FilterSet>,
}

impl Filter {
    pub fn passes(&self, n: &NeighborRecord) -> bool {
        self.sets.is_empty() || self.sets.iter().any(|set| set.iter().all(|a| a.matches(n)))
    }
}

/// One `-F` token is one filter-set (conjunction): the entry delimiter
/// (`%`) separates its atoms, each an `attribute:regex` pair joined by the
/// value delimiter. Repeating `-F` ORs the resulting filter-sets together.
pub fn build_filters(inputs: &[String]) -> Filter {
    let parsed = parse_expression(inputs, FILTER_DELIMS);
    let mut sets = Vec::new();
    for p in parsed {
        match p {
            ParsedExpr::String(atoms) => {
                if let Some(set) = filterset_from_atoms(&atoms) {
                    sets.push(set);
                }
            },
            ParsedExpr::File(value) => sets.extend(filtersets_from_file_value(value)),
        }
    }
    Filter { sets }
}

fn filterset_from_atoms(atoms: &[Vec<String>]) -> Option<FilterSet> {
    let mut set = Vec::with_capacity(atoms.len());
    for fields in atoms {
        if fields.len() < 2 {
            warn!(target: TARGET_CORE, "filter atom missing attribute or regex, dropping filter-set");
            return None;
        }
        let attribute = fields[0].clone();
        if !ALLOWED_ATTRIBUTES.contains(&attribute.as_str()) {
            warn!(target: TARGET_CORE, %attribute, "unknown neighbor attribute in filter, dropping filter-set");
            return None;
        }
        let regex = match Regex::new(&fields[1]) {
            Ok(r) => r,
            Err(e) => {
                warn!(target: TARGET_CORE, pattern = %fields[1], error = %e, "invalid regex in filter, dropping filter-set");
                return None;
            },
        };
        set.push(FilterAtom { attribute, regex });
    }
    Some(set)
}

fn filtersets_from_file_value(value: serde_yaml::Value) -> Vec<FilterSet> {
    #[derive(serde::Deserialize)]
    struct RawAtom {
        attribute: String,
        regex: String,
    }
    let raw: Vec<Vec<RawAtom>> = match serde_yaml::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            warn!(target: TARGET_CORE, error = %e, "malformed filter file, dropping");
            return Vec::new();
        },
    };
    raw.into_iter()
        .filter_map(|entries| {
            let mut set = Vec::with_capacity(entries.len());
            for a in entries {
                if !ALLOWED_ATTRIBUTES.contains(&a.attribute.as_str()) {
                    warn!(target: TARGET_CORE, attribute = %a.attribute, "unknown neighbor attribute in filter file, dropping filter-set");
                    return None;
                }
                let regex = Regex::new(&a.regex).ok()?;
                set.push(FilterAtom {
                    attribute: a.attribute,
                    regex,
                });
            }
            Some(set)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(sysname: &str, addr: &str) -> NeighborRecord {
        NeighborRecord {
            sysname: vec![sysname.to_string()],
            addresses: vec![addr.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let f = Filter::default();
        assert!(f.passes(&neighbor("sw1", "10.0.0.1")));
    }

    #[test]
    fn or_of_ands_semantics() {
        let f = build_filters(&["sysname:^sw1$".to_string(), "sysname:^sw2$".to_string()]);
        assert!(f.passes(&neighbor("sw1", "10.0.0.1")));
        assert!(f.passes(&neighbor("sw2", "10.0.0.2")));
        assert!(!f.passes(&neighbor("sw3", "10.0.0.3")));
    }

    #[test]
    fn conjunction_requires_every_atom() {
        let f = build_filters(&["sysname:^sw1$%addresses:^10\\.".to_string()]);
        assert!(f.passes(&neighbor("sw1", "10.0.0.1")));
        assert!(!f.passes(&neighbor("sw1", "192.168.0.1")));
    }

    #[test]
    fn unknown_attribute_drops_the_filter_set() {
        let f = build_filters(&["bogus:^x$".to_string()]);
        assert!(f.sets.is_empty());
        assert!(f.passes(&neighbor("sw1", "10.0.0.1")));
    }
}
