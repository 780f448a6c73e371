//! Mutable XOAI record document
//!
//! A DOM tied to an OAI identifier. Serialization omits the XML
//! declaration, indents, and encodes UTF-8; parse → serialize → parse is
//! stable modulo the indentation the serializer introduces.

use xmltree::{Element, EmitterConfig, XMLNode};

use oaistore_core::{Result, StoreError};

use crate::address::{FieldAddress, FieldTarget, Step};
use crate::namespaces::default_namespaces;

const ELEMENT_TAG: &str = "element";
const FIELD_TAG: &str = "field";
const ROOT_TAG: &str = "metadata";

/// One record's metadata DOM plus its identifier
#[derive(Debug, Clone)]
pub struct RecordDocument {
    identifier: String,
    root: Element,
}

impl RecordDocument {
    /// Create an empty document (a bare `metadata` root with the default
    /// namespace declarations)
    pub fn new(identifier: impl Into<String>) -> Self {
        let mut root = Element::new(ROOT_TAG);
        root.namespaces = Some(default_namespaces());
        RecordDocument {
            identifier: identifier.into(),
            root,
        }
    }

    /// Parse a harvested payload
    pub fn from_xml(identifier: impl Into<String>, xml: &str) -> Result<Self> {
        let root = Element::parse(xml.as_bytes())
            .map_err(|e| StoreError::parse(format!("XML parse error: {}", e)))?;
        Ok(RecordDocument {
            identifier: identifier.into(),
            root,
        })
    }

    /// The OAI identifier this document belongs to
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The document root element
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Serialize without an XML declaration, indented, UTF-8
    pub fn to_xml(&self) -> Result<String> {
        let config = EmitterConfig::new()
            .write_document_declaration(false)
            .perform_indent(true);
        let mut out = Vec::new();
        self.root
            .write_with_config(&mut out, config)
            .map_err(|e| StoreError::parse(format!("XML serialize error: {}", e)))?;
        String::from_utf8(out).map_err(|_| StoreError::parse("serializer produced invalid UTF-8"))
    }

    /// Ordered text of the fields matching a dotted address
    ///
    /// With a `$`-truncated address the direct field children of every
    /// matched element are collected instead.
    pub fn get_field_occurrences(&self, name: &str) -> Result<Vec<String>> {
        let addr = FieldAddress::parse(name)?;
        let mut out = Vec::new();
        for element in collect_elements(&self.root, &addr.steps) {
            match &addr.target {
                FieldTarget::Field(field) => {
                    for child in field_children(element, Some(field)) {
                        out.push(text_of(child));
                    }
                }
                FieldTarget::ElementOnly => {
                    for child in field_children(element, None) {
                        out.push(text_of(child));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Append a field occurrence, creating missing intermediate elements
    ///
    /// When the final element already exists the new field joins its
    /// existing field children; a `$`-truncated address adds a field named
    /// `value`. Wildcard steps cannot be created; addressing a `*` level
    /// that matches nothing is an error.
    pub fn add_field_occurrence(&mut self, name: &str, content: &str) -> Result<()> {
        let addr = FieldAddress::parse(name)?;
        let element = ensure_chain(&mut self.root, &addr.steps)?;
        let field_name = addr.field_name().unwrap_or("value");

        let mut field = Element::new(FIELD_TAG);
        field
            .attributes
            .insert("name".to_string(), field_name.to_string());
        field.children.push(XMLNode::Text(content.to_string()));
        element.children.push(XMLNode::Element(field));
        Ok(())
    }

    /// Remove matching occurrences and prune ancestors left childless
    ///
    /// With a field target the matching `<field>` children are removed;
    /// with a `$`-truncated address the matched elements themselves go.
    /// Any ancestor `<element>` that loses its last element or field child
    /// in the process is removed too. Returns how many nodes were removed.
    pub fn remove_field_occurrence(&mut self, name: &str) -> Result<usize> {
        let addr = FieldAddress::parse(name)?;
        Ok(remove_from(&mut self.root, &addr.steps, &addr.target))
    }

    /// Replace the text of the single field matching the address
    ///
    /// Fails with `NotFound` when nothing matches and `Invalid` when the
    /// address is ambiguous (several occurrences) or `$`-truncated.
    pub fn replace_field_occurrence(&mut self, name: &str, content: &str) -> Result<()> {
        let addr = FieldAddress::parse(name)?;
        let field = match &addr.target {
            FieldTarget::Field(field) => field.clone(),
            FieldTarget::ElementOnly => {
                return Err(StoreError::invalid(format!(
                    "cannot replace an element path: {}",
                    name
                )))
            }
        };

        let mut matches = Vec::new();
        collect_fields_mut(&mut self.root, &addr.steps, &field, &mut matches);
        match matches.len() {
            0 => Err(StoreError::not_found(format!("field occurrence {}", name))),
            1 => {
                let target = matches.pop().expect("one match");
                target.children.clear();
                target.children.push(XMLNode::Text(content.to_string()));
                Ok(())
            }
            n => Err(StoreError::invalid(format!(
                "field address {} matches {} occurrences; replace needs exactly one",
                name, n
            ))),
        }
    }
}

fn is_element_matching(el: &Element, step: &Step) -> bool {
    if el.name != ELEMENT_TAG {
        return false;
    }
    match step {
        Step::Any => true,
        Step::Named(name) => el.attributes.get("name").map(String::as_str) == Some(name),
    }
}

fn collect_elements<'a>(root: &'a Element, steps: &[Step]) -> Vec<&'a Element> {
    let mut current = vec![root];
    for step in steps {
        let mut next = Vec::new();
        for element in current {
            for child in &element.children {
                if let XMLNode::Element(ce) = child {
                    if is_element_matching(ce, step) {
                        next.push(ce);
                    }
                }
            }
        }
        current = next;
    }
    current
}

fn field_children<'a>(element: &'a Element, name: Option<&str>) -> Vec<&'a Element> {
    element
        .children
        .iter()
        .filter_map(|child| match child {
            XMLNode::Element(ce) if ce.name == FIELD_TAG => match name {
                Some(expected) => {
                    (ce.attributes.get("name").map(String::as_str) == Some(expected)).then_some(ce)
                }
                None => Some(ce),
            },
            _ => None,
        })
        .collect()
}

fn text_of(element: &Element) -> String {
    element
        .get_text()
        .map(|t| t.into_owned())
        .unwrap_or_default()
}

fn ensure_chain<'a>(root: &'a mut Element, steps: &[Step]) -> Result<&'a mut Element> {
    let mut current = root;
    for step in steps {
        let position = current.children.iter().position(|child| {
            matches!(child, XMLNode::Element(ce) if is_element_matching(ce, step))
        });
        let index = match position {
            Some(index) => index,
            None => {
                let name = match step {
                    Step::Named(name) => name.clone(),
                    Step::Any => {
                        return Err(StoreError::invalid(
                            "cannot create an element for a wildcard step",
                        ))
                    }
                };
                let mut element = Element::new(ELEMENT_TAG);
                element.attributes.insert("name".to_string(), name);
                current.children.push(XMLNode::Element(element));
                current.children.len() - 1
            }
        };
        current = match &mut current.children[index] {
            XMLNode::Element(ce) => ce,
            _ => unreachable!("position matched an element node"),
        };
    }
    Ok(current)
}

fn has_structural_children(element: &Element) -> bool {
    element
        .children
        .iter()
        .any(|child| matches!(child, XMLNode::Element(_)))
}

fn remove_from(element: &mut Element, steps: &[Step], target: &FieldTarget) -> usize {
    let mut removed = 0;

    if steps.is_empty() {
        if let FieldTarget::Field(field) = target {
            let before = element.children.len();
            element.children.retain(|child| {
                !matches!(
                    child,
                    XMLNode::Element(ce)
                        if ce.name == FIELD_TAG
                            && ce.attributes.get("name").map(String::as_str) == Some(field.as_str())
                )
            });
            removed += before - element.children.len();
        }
        return removed;
    }

    let step = &steps[0];
    let last = steps.len() == 1;
    let mut index = 0;
    while index < element.children.len() {
        let matched = matches!(
            &element.children[index],
            XMLNode::Element(ce) if is_element_matching(ce, step)
        );
        if !matched {
            index += 1;
            continue;
        }

        if last && matches!(target, FieldTarget::ElementOnly) {
            element.children.remove(index);
            removed += 1;
            continue;
        }

        let removed_below = match &mut element.children[index] {
            XMLNode::Element(ce) => remove_from(ce, &steps[1..], target),
            _ => 0,
        };
        removed += removed_below;

        let now_childless = matches!(
            &element.children[index],
            XMLNode::Element(ce) if !has_structural_children(ce)
        );
        if removed_below > 0 && now_childless {
            element.children.remove(index);
            continue;
        }
        index += 1;
    }
    removed
}

fn collect_fields_mut<'a>(
    element: &'a mut Element,
    steps: &[Step],
    field: &str,
    out: &mut Vec<&'a mut Element>,
) {
    if steps.is_empty() {
        for child in element.children.iter_mut() {
            if let XMLNode::Element(ce) = child {
                if ce.name == FIELD_TAG
                    && ce.attributes.get("name").map(String::as_str) == Some(field)
                {
                    out.push(ce);
                }
            }
        }
        return;
    }
    let step = &steps[0];
    for child in element.children.iter_mut() {
        if let XMLNode::Element(ce) = child {
            if is_element_matching(ce, step) {
                collect_fields_mut(ce, &steps[1..], field, out);
            }
        }
    }
}
