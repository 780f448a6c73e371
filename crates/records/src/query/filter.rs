//! Record filter grammar
//!
//! Filters arrive as strings of the form `key:value` or `key@@value`;
//! surrounding single or double quotes on the value are stripped. Known
//! keys:
//!
//! - `record_is_valid:<bool>`
//! - `record_is_transformed:<bool>`
//! - `invalid_rules:<id>[,<id>...]`: any listed rule failed on the record
//! - `valid_rules:<id>[,<id>...]`: any listed rule passed on the record
//!
//! Unknown keys are ignored with a warning; multiple filters combine by
//! conjunction. Each filter list is parsed once per call, not per record.

use tracing::warn;

use oaistore_core::RecordValidation;

/// One parsed record filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Keep records whose validity flag matches
    RecordIsValid(bool),
    /// Keep records whose transformed flag matches
    RecordIsTransformed(bool),
    /// Keep records where any listed rule failed
    InvalidRules(Vec<i32>),
    /// Keep records where any listed rule passed
    ValidRules(Vec<i32>),
}

impl RecordFilter {
    /// Whether a record passes this filter
    pub fn matches(&self, record: &RecordValidation) -> bool {
        match self {
            RecordFilter::RecordIsValid(expected) => record.record_is_valid == *expected,
            RecordFilter::RecordIsTransformed(expected) => record.is_transformed == *expected,
            RecordFilter::InvalidRules(ids) => record
                .rule_facts
                .iter()
                .any(|f| !f.is_valid && ids.contains(&f.rule_id)),
            RecordFilter::ValidRules(ids) => record
                .rule_facts
                .iter()
                .any(|f| f.is_valid && ids.contains(&f.rule_id)),
        }
    }
}

/// Whether a record passes every filter in the list
pub fn matches_all(filters: &[RecordFilter], record: &RecordValidation) -> bool {
    filters.iter().all(|f| f.matches(record))
}

/// Parse raw filter strings, dropping malformed or unknown entries
pub fn parse_filters(raw: &[String]) -> Vec<RecordFilter> {
    let mut filters = Vec::with_capacity(raw.len());
    for entry in raw {
        match parse_one(entry) {
            Some(filter) => filters.push(filter),
            None => warn!(filter = %entry, "ignoring unrecognized record filter"),
        }
    }
    filters
}

fn parse_one(entry: &str) -> Option<RecordFilter> {
    let (key, value) = split_entry(entry)?;
    let value = strip_quotes(value);
    match key {
        "record_is_valid" => parse_bool(value).map(RecordFilter::RecordIsValid),
        "record_is_transformed" => parse_bool(value).map(RecordFilter::RecordIsTransformed),
        "invalid_rules" => {
            let ids = parse_rule_ids(value);
            (!ids.is_empty()).then_some(RecordFilter::InvalidRules(ids))
        }
        "valid_rules" => {
            let ids = parse_rule_ids(value);
            (!ids.is_empty()).then_some(RecordFilter::ValidRules(ids))
        }
        _ => None,
    }
}

fn split_entry(entry: &str) -> Option<(&str, &str)> {
    if let Some(idx) = entry.find("@@") {
        return Some((&entry[..idx], &entry[idx + 2..]));
    }
    entry.split_once(':')
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_rule_ids(value: &str) -> Vec<i32> {
    value
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            match part.parse::<i32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    if !part.is_empty() {
                        warn!(rule = %part, "ignoring unparseable rule id in filter");
                    }
                    None
                }
            }
        })
        .collect()
}
