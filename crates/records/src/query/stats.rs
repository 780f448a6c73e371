//! Aggregates over validation records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use oaistore_core::RecordValidation;

/// Per-rule record counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    /// Records where the rule passed
    pub valid_count: u64,
    /// Records where the rule failed
    pub invalid_count: u64,
}

/// Aggregated stats for a (possibly filtered) record set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Records in the filtered set
    pub total_records: u64,
    /// Records with `record_is_valid == true`
    pub valid_records: u64,
    /// Records with `is_transformed == true`
    pub transformed_records: u64,
    /// Per-rule pass/fail record counts
    pub rules: BTreeMap<i32, RuleStats>,
    /// Record counts faceted by validity and transformation
    pub facets: BTreeMap<String, u64>,
}

impl ValidationStats {
    /// Aggregate a record set
    pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a RecordValidation>) -> Self {
        let mut stats = ValidationStats::default();
        for record in records {
            stats.total_records += 1;
            if record.record_is_valid {
                stats.valid_records += 1;
            }
            if record.is_transformed {
                stats.transformed_records += 1;
            }
            for fact in &record.rule_facts {
                let rule = stats.rules.entry(fact.rule_id).or_default();
                if fact.is_valid {
                    rule.valid_count += 1;
                } else {
                    rule.invalid_count += 1;
                }
            }
        }
        stats.facets = BTreeMap::from([
            ("valid".to_string(), stats.valid_records),
            (
                "invalid".to_string(),
                stats.total_records - stats.valid_records,
            ),
            ("transformed".to_string(), stats.transformed_records),
            (
                "untransformed".to_string(),
                stats.total_records - stats.transformed_records,
            ),
        ]);
        stats
    }
}

/// Occurrence-value histograms for one rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOccurrences {
    /// Count per distinct valid occurrence value
    pub valid: BTreeMap<String, u64>,
    /// Count per distinct invalid occurrence value
    pub invalid: BTreeMap<String, u64>,
}

impl RuleOccurrences {
    /// Histogram a rule's occurrence strings across a record set
    pub fn aggregate<'a>(
        records: impl IntoIterator<Item = &'a RecordValidation>,
        rule_id: i32,
    ) -> Self {
        let mut occurrences = RuleOccurrences::default();
        for record in records {
            for fact in record.rule_facts.iter().filter(|f| f.rule_id == rule_id) {
                for value in &fact.valid_occurrences {
                    *occurrences.valid.entry(value.clone()).or_insert(0) += 1;
                }
                for value in &fact.invalid_occurrences {
                    *occurrences.invalid.entry(value.clone()).or_insert(0) += 1;
                }
            }
        }
        occurrences
    }
}
