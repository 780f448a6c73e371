//! Transformer registry

use std::collections::HashMap;

use oaistore_core::{Result, StoreError};

use crate::document::RecordDocument;

use super::FormatTransformer;

/// Registry of transformers keyed by `(source_format, target_format)`
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: HashMap<(String, String), Box<dyn FormatTransformer>>,
}

impl TransformerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        TransformerRegistry::default()
    }

    /// Register a transformer for a format pair, replacing any previous one
    pub fn register(
        &mut self,
        source_format: impl Into<String>,
        target_format: impl Into<String>,
        transformer: Box<dyn FormatTransformer>,
    ) {
        self.transformers
            .insert((source_format.into(), target_format.into()), transformer);
    }

    /// Whether a pair has a registered transformer
    pub fn supports(&self, source_format: &str, target_format: &str) -> bool {
        self.transformers
            .contains_key(&(source_format.to_string(), target_format.to_string()))
    }

    /// Registered format pairs
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self.transformers.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    /// Transform a document between formats
    ///
    /// Fails with `TransformerNotFound` when the pair has no registered
    /// transformer.
    pub fn transform(
        &self,
        source_format: &str,
        target_format: &str,
        doc: &RecordDocument,
    ) -> Result<RecordDocument> {
        let transformer = self
            .transformers
            .get(&(source_format.to_string(), target_format.to_string()))
            .ok_or_else(|| StoreError::transformer_not_found(source_format, target_format))?;
        transformer.transform(doc)
    }
}
