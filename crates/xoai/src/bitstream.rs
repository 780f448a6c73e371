//! Bitstream interpretation of the `bundles` subtree
//!
//! XOAI carries the repository's files as
//! `bundles.bundle / bundle.bitstreams.bitstream` elements whose field
//! children describe one file each. URLs are percent-decoded and
//! validated; a bitstream with an unusable URL keeps its other fields.

use tracing::warn;
use url::Url;

use oaistore_core::Result;

use crate::document::RecordDocument;

/// One file attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitstream {
    /// Sequence id within the bundle
    pub sid: Option<i32>,
    /// Declared type of the bitstream
    pub kind: Option<String>,
    /// File name
    pub name: Option<String>,
    /// MIME format
    pub format: Option<String>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Decoded, validated download URL
    pub url: Option<String>,
    /// Repository checksum
    pub checksum: Option<String>,
}

/// Interpret a record's bundles into bitstream descriptors
pub fn get_bitstreams(doc: &RecordDocument) -> Result<Vec<Bitstream>> {
    let mut bitstreams = Vec::new();
    for bundle in elements_at(doc, &["bundles", "bundle"]) {
        for container in child_elements(bundle, "bitstreams") {
            for bitstream in child_elements(container, "bitstream") {
                bitstreams.push(read_bitstream(bitstream));
            }
        }
    }
    Ok(bitstreams)
}

fn read_bitstream(element: &xmltree::Element) -> Bitstream {
    let field = |name: &str| field_value(element, name);
    Bitstream {
        sid: field("sid").and_then(|v| match v.trim().parse::<i32>() {
            Ok(sid) => Some(sid),
            Err(_) => {
                warn!(sid = %v, "bitstream sid is not an integer");
                None
            }
        }),
        kind: field("type"),
        name: field("name"),
        format: field("format"),
        size: field("size").and_then(|v| v.trim().parse::<u64>().ok()),
        url: field("url").and_then(|raw| decode_url(&raw)),
        checksum: field("checksum"),
    }
}

fn decode_url(raw: &str) -> Option<String> {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            warn!(url = %raw, "bitstream url is not valid percent-encoding");
            return None;
        }
    };
    match Url::parse(&decoded) {
        Ok(_) => Some(decoded),
        Err(e) => {
            warn!(url = %decoded, error = %e, "bitstream url failed validation");
            None
        }
    }
}

fn elements_at<'a>(doc: &'a RecordDocument, names: &[&str]) -> Vec<&'a xmltree::Element> {
    let mut current = vec![doc.root()];
    for name in names {
        let mut next = Vec::new();
        for element in current {
            next.extend(child_elements(element, name));
        }
        current = next;
    }
    current
}

fn child_elements<'a>(element: &'a xmltree::Element, name: &str) -> Vec<&'a xmltree::Element> {
    element
        .children
        .iter()
        .filter_map(|child| match child {
            xmltree::XMLNode::Element(ce)
                if ce.name == "element"
                    && ce.attributes.get("name").map(String::as_str) == Some(name) =>
            {
                Some(ce)
            }
            _ => None,
        })
        .collect()
}

fn field_value(element: &xmltree::Element, name: &str) -> Option<String> {
    element.children.iter().find_map(|child| match child {
        xmltree::XMLNode::Element(ce)
            if ce.name == "field"
                && ce.attributes.get("name").map(String::as_str) == Some(name) =>
        {
            Some(ce.get_text().map(|t| t.into_owned()).unwrap_or_default())
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<metadata>
  <element name="bundles">
    <element name="bundle">
      <field name="name">ORIGINAL</field>
      <element name="bitstreams">
        <element name="bitstream">
          <field name="sid">1</field>
          <field name="type">text</field>
          <field name="name">paper.pdf</field>
          <field name="format">application/pdf</field>
          <field name="size">52417</field>
          <field name="url">https://repo.example/bitstream/a%20b.pdf</field>
          <field name="checksum">aabbcc</field>
        </element>
        <element name="bitstream">
          <field name="sid">not-a-number</field>
          <field name="url">::not a url::</field>
        </element>
      </element>
    </element>
  </element>
</metadata>"#;

    #[test]
    fn test_reads_bitstream_fields() {
        let doc = RecordDocument::from_xml("oai:x:1", SAMPLE).unwrap();
        let bitstreams = get_bitstreams(&doc).unwrap();
        assert_eq!(bitstreams.len(), 2);

        let first = &bitstreams[0];
        assert_eq!(first.sid, Some(1));
        assert_eq!(first.kind.as_deref(), Some("text"));
        assert_eq!(first.name.as_deref(), Some("paper.pdf"));
        assert_eq!(first.format.as_deref(), Some("application/pdf"));
        assert_eq!(first.size, Some(52417));
        assert_eq!(first.checksum.as_deref(), Some("aabbcc"));
    }

    #[test]
    fn test_url_is_decoded() {
        let doc = RecordDocument::from_xml("oai:x:1", SAMPLE).unwrap();
        let bitstreams = get_bitstreams(&doc).unwrap();
        assert_eq!(
            bitstreams[0].url.as_deref(),
            Some("https://repo.example/bitstream/a b.pdf")
        );
    }

    #[test]
    fn test_bad_sid_and_url_degrade_to_none() {
        let doc = RecordDocument::from_xml("oai:x:1", SAMPLE).unwrap();
        let bitstreams = get_bitstreams(&doc).unwrap();
        assert_eq!(bitstreams[1].sid, None);
        assert_eq!(bitstreams[1].url, None);
    }

    #[test]
    fn test_document_without_bundles_reads_empty() {
        let doc = RecordDocument::from_xml("oai:x:1", "<metadata/>").unwrap();
        assert!(get_bitstreams(&doc).unwrap().is_empty());
    }
}
