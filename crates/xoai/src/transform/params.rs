//! Explicit transformer parameter binding
//!
//! Transformer options are enumerated in an explicit parameter set built
//! at registration time; `bind_parameters` pushes each entry into the
//! transformer under `prefix + lowercase(name)`, turning string-array
//! values into list parameters.

use std::collections::BTreeMap;

use tracing::warn;

use super::FormatTransformer;

/// A scalar or list parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Plain string parameter
    Text(String),
    /// String-array parameter, delivered as an `<items>` document
    List(Vec<String>),
}

/// Named parameter set for one transformer registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformerParameters {
    values: BTreeMap<String, ParamValue>,
}

impl TransformerParameters {
    /// Create an empty set
    pub fn new() -> Self {
        TransformerParameters::default()
    }

    /// Add a scalar parameter
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(name.into(), ParamValue::Text(value.into()));
        self
    }

    /// Add a string-array parameter
    pub fn with_list(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.values.insert(name.into(), ParamValue::List(values));
        self
    }

    /// Iterate the entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bind every parameter into the transformer
///
/// Each entry lands as `prefix + lowercase(name)`; entries with empty
/// names are skipped with a warning.
pub fn bind_parameters(
    transformer: &mut dyn FormatTransformer,
    prefix: &str,
    parameters: &TransformerParameters,
) {
    for (name, value) in parameters.iter() {
        if name.is_empty() {
            warn!("skipping transformer parameter with empty name");
            continue;
        }
        let key = format!("{}{}", prefix, name.to_lowercase());
        match value {
            ParamValue::Text(text) => transformer.set_parameter(&key, text),
            ParamValue::List(values) => transformer.set_list_parameter(&key, values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::FieldMapTransformer;

    #[test]
    fn test_bind_lowercases_and_prefixes() {
        let mut transformer = FieldMapTransformer::new(vec![]);
        let params = TransformerParameters::new()
            .with_text("RepositoryName", "Scholar Commons")
            .with_list("Sets", vec!["a".to_string()]);

        bind_parameters(&mut transformer, "xslt.", &params);
        assert_eq!(
            transformer.parameter("xslt.repositoryname"),
            Some("Scholar Commons")
        );
        assert_eq!(
            transformer.parameter("xslt.sets"),
            Some("<items><item>a</item></items>")
        );
    }

    #[test]
    fn test_empty_set_binds_nothing() {
        let mut transformer = FieldMapTransformer::new(vec![]);
        bind_parameters(&mut transformer, "p.", &TransformerParameters::new());
        assert!(transformer.parameter("p.anything").is_none());
    }
}
