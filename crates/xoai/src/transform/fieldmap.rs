//! Declarative field-mapping transformer
//!
//! The shipping transformer: a pipeline of copy/constant rules over the
//! XOAI field model. Copy rules move every occurrence of a source address
//! to a target address; constant rules inject a named parameter's value.

use std::collections::BTreeMap;

use tracing::warn;

use oaistore_core::Result;

use crate::document::RecordDocument;

use super::{encode_list_parameter, FormatTransformer};

/// One mapping rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapRule {
    /// Copy every occurrence of `from` into `to`
    Copy {
        /// Source field address
        from: String,
        /// Target field address
        to: String,
    },
    /// Write the value of a named parameter into `to`
    Constant {
        /// Target field address
        to: String,
        /// Parameter supplying the value
        parameter: String,
    },
}

impl FieldMapRule {
    /// Copy rule
    pub fn copy(from: impl Into<String>, to: impl Into<String>) -> Self {
        FieldMapRule::Copy {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Constant-from-parameter rule
    pub fn constant(to: impl Into<String>, parameter: impl Into<String>) -> Self {
        FieldMapRule::Constant {
            to: to.into(),
            parameter: parameter.into(),
        }
    }
}

/// Field-mapping transformer
pub struct FieldMapTransformer {
    rules: Vec<FieldMapRule>,
    parameters: BTreeMap<String, String>,
}

impl FieldMapTransformer {
    /// Create a transformer from its rule pipeline
    pub fn new(rules: Vec<FieldMapRule>) -> Self {
        FieldMapTransformer {
            rules,
            parameters: BTreeMap::new(),
        }
    }

    /// Current value of a parameter
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

impl FormatTransformer for FieldMapTransformer {
    fn transform(&self, doc: &RecordDocument) -> Result<RecordDocument> {
        let mut out = RecordDocument::new(doc.identifier());
        for rule in &self.rules {
            match rule {
                FieldMapRule::Copy { from, to } => {
                    for occurrence in doc.get_field_occurrences(from)? {
                        out.add_field_occurrence(to, &occurrence)?;
                    }
                }
                FieldMapRule::Constant { to, parameter } => match self.parameters.get(parameter) {
                    Some(value) => out.add_field_occurrence(to, value)?,
                    None => {
                        warn!(parameter = %parameter, "constant rule without a bound parameter");
                    }
                },
            }
        }
        Ok(out)
    }

    fn set_parameter(&mut self, name: &str, value: &str) {
        if name.is_empty() || value.is_empty() {
            warn!("ignoring transformer parameter with empty name or value");
            return;
        }
        self.parameters.insert(name.to_string(), value.to_string());
    }

    fn set_list_parameter(&mut self, name: &str, values: &[String]) {
        if name.is_empty() {
            warn!("ignoring transformer list parameter with empty name");
            return;
        }
        self.parameters
            .insert(name.to_string(), encode_list_parameter(values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RecordDocument {
        let mut doc = RecordDocument::new("oai:x:1");
        doc.add_field_occurrence("dc.title", "A title").unwrap();
        doc.add_field_occurrence("dc.title", "Another title").unwrap();
        doc.add_field_occurrence("dc.date.issued", "2022").unwrap();
        doc
    }

    #[test]
    fn test_copy_preserves_all_occurrences() {
        let transformer = FieldMapTransformer::new(vec![
            FieldMapRule::copy("dc.title", "title"),
            FieldMapRule::copy("dc.date.issued", "date"),
        ]);
        let out = transformer.transform(&source()).unwrap();
        assert_eq!(
            out.get_field_occurrences("title").unwrap(),
            vec!["A title", "Another title"]
        );
        assert_eq!(out.get_field_occurrences("date").unwrap(), vec!["2022"]);
        assert_eq!(out.identifier(), "oai:x:1");
    }

    #[test]
    fn test_constant_rule_reads_parameter() {
        let mut transformer =
            FieldMapTransformer::new(vec![FieldMapRule::constant("provenance.repository", "repo")]);
        transformer.set_parameter("repo", "Scholar Commons");
        let out = transformer.transform(&source()).unwrap();
        assert_eq!(
            out.get_field_occurrences("provenance.repository").unwrap(),
            vec!["Scholar Commons"]
        );
    }

    #[test]
    fn test_unbound_constant_is_skipped() {
        let transformer =
            FieldMapTransformer::new(vec![FieldMapRule::constant("provenance.repository", "repo")]);
        let out = transformer.transform(&source()).unwrap();
        assert!(out
            .get_field_occurrences("provenance.repository")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_empty_parameter_name_ignored() {
        let mut transformer = FieldMapTransformer::new(vec![]);
        transformer.set_parameter("", "x");
        transformer.set_parameter("ok", "");
        assert!(transformer.parameter("").is_none());
        assert!(transformer.parameter("ok").is_none());

        transformer.set_parameter("ok", "yes");
        assert_eq!(transformer.parameter("ok"), Some("yes"));
    }

    #[test]
    fn test_list_parameter_encoded_as_items() {
        let mut transformer = FieldMapTransformer::new(vec![]);
        transformer.set_list_parameter("sets", &["a".to_string(), "b".to_string()]);
        assert_eq!(
            transformer.parameter("sets"),
            Some("<items><item>a</item><item>b</item></items>")
        );
    }
}
