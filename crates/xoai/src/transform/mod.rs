//! Format transformer service
//!
//! A registry maps `(source_format, target_format)` pairs to transformers.
//! Transformers are parameterized by name: scalar parameters pass through
//! as strings, list parameters are encoded as an `<items><item>…</item>`
//! document so downstream stylesheets can iterate them. Output follows the
//! document serializer's contract (no XML declaration, indented, UTF-8).

mod fieldmap;
mod params;
mod registry;

pub use fieldmap::{FieldMapRule, FieldMapTransformer};
pub use params::{bind_parameters, ParamValue, TransformerParameters};
pub use registry::TransformerRegistry;

use xmltree::{Element, EmitterConfig, XMLNode};

use oaistore_core::Result;

use crate::document::RecordDocument;

/// A document-to-document format transformer
///
/// Implementations are registered per format pair and invoked through the
/// [`TransformerRegistry`]. Parameters are set before registration; the
/// transform itself takes the document by shared reference and returns a
/// fresh one.
pub trait FormatTransformer: Send + Sync {
    /// Transform one document into the target format
    fn transform(&self, doc: &RecordDocument) -> Result<RecordDocument>;

    /// Set a scalar parameter
    ///
    /// Empty names or values are ignored with a warning.
    fn set_parameter(&mut self, name: &str, value: &str);

    /// Set a list parameter
    ///
    /// The value reaches the transformer as an `<items>` document; empty
    /// names are ignored with a warning.
    fn set_list_parameter(&mut self, name: &str, values: &[String]);
}

/// Encode a list parameter as an `<items><item>…</item></items>` document
pub fn encode_list_parameter(values: &[String]) -> String {
    let mut items = Element::new("items");
    for value in values {
        let mut item = Element::new("item");
        item.children.push(XMLNode::Text(value.clone()));
        items.children.push(XMLNode::Element(item));
    }
    let config = EmitterConfig::new()
        .write_document_declaration(false)
        .perform_indent(false);
    let mut out = Vec::new();
    items
        .write_with_config(&mut out, config)
        .expect("in-memory serialization");
    String::from_utf8(out).expect("serializer emits UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_list_parameter() {
        let encoded = encode_list_parameter(&["a".to_string(), "b".to_string()]);
        assert_eq!(encoded, "<items><item>a</item><item>b</item></items>");
    }

    #[test]
    fn test_encode_escapes_markup() {
        let encoded = encode_list_parameter(&["a<b".to_string()]);
        assert!(encoded.contains("a&lt;b"));
    }

    #[test]
    fn test_encode_empty_list() {
        assert_eq!(encode_list_parameter(&[]), "<items />");
    }
}
