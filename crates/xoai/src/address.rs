//! Dotted field addressing
//!
//! A field name `a.b.c:field` addresses the chain of `<element name>`
//! nodes `a`, `b`, `c` under the document root and then the `<field>`
//! child named `field`. Without a `:field` suffix the field name defaults
//! to `value`. Two special tokens:
//!
//! - `*` matches any element at its level;
//! - a trailing `$` truncates the address at the element path, selecting
//!   the elements themselves rather than a field child.
//!
//! The identity address `.` refers to the document root.

use oaistore_core::{Result, StoreError};

/// One step along the element chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Match the element with this `name` attribute
    Named(String),
    /// Match any element at this level
    Any,
}

/// What the address selects once the chain is walked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// A `<field>` child with this `name` attribute
    Field(String),
    /// The chain's final elements themselves (`$` truncation)
    ElementOnly,
}

/// A parsed field address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAddress {
    /// Element chain under the document root
    pub steps: Vec<Step>,
    /// Field or element selection at the end of the chain
    pub target: FieldTarget,
}

impl FieldAddress {
    /// Parse a dotted field name
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::parse("empty field address"));
        }
        if name == "." {
            return Ok(FieldAddress {
                steps: Vec::new(),
                target: FieldTarget::ElementOnly,
            });
        }

        let (path, field) = match name.rsplit_once(':') {
            Some((path, field)) => {
                if field.is_empty() {
                    return Err(StoreError::parse(format!(
                        "field address {:?} has an empty field name",
                        name
                    )));
                }
                (path, Some(field.to_string()))
            }
            None => (name, None),
        };

        let mut element_only = false;
        let path = if let Some(stripped) = path.strip_suffix('$') {
            element_only = true;
            stripped.strip_suffix('.').unwrap_or(stripped)
        } else {
            path
        };
        if element_only && field.is_some() {
            return Err(StoreError::parse(format!(
                "field address {:?} combines '$' with a field name",
                name
            )));
        }

        let mut steps = Vec::new();
        for token in path.split('.') {
            if token.is_empty() {
                return Err(StoreError::parse(format!(
                    "field address {:?} has an empty path token",
                    name
                )));
            }
            steps.push(match token {
                "*" => Step::Any,
                _ => Step::Named(token.to_string()),
            });
        }

        let target = if element_only {
            FieldTarget::ElementOnly
        } else {
            FieldTarget::Field(field.unwrap_or_else(|| "value".to_string()))
        };
        Ok(FieldAddress { steps, target })
    }

    /// Field name selected by this address, if any
    pub fn field_name(&self) -> Option<&str> {
        match &self.target {
            FieldTarget::Field(name) => Some(name),
            FieldTarget::ElementOnly => None,
        }
    }
}

impl std::fmt::Display for FieldAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path: Vec<&str> = self
            .steps
            .iter()
            .map(|s| match s {
                Step::Named(name) => name.as_str(),
                Step::Any => "*",
            })
            .collect();
        write!(f, "{}", path.join("."))?;
        match &self.target {
            FieldTarget::Field(name) => write!(f, ":{}", name),
            FieldTarget::ElementOnly => write!(f, "$"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_field_is_value() {
        let addr = FieldAddress::parse("dc.title").unwrap();
        assert_eq!(
            addr.steps,
            vec![Step::Named("dc".into()), Step::Named("title".into())]
        );
        assert_eq!(addr.target, FieldTarget::Field("value".into()));
    }

    #[test]
    fn test_explicit_field_suffix() {
        let addr = FieldAddress::parse("dc.title:lang").unwrap();
        assert_eq!(addr.field_name(), Some("lang"));
    }

    #[test]
    fn test_wildcard_step() {
        let addr = FieldAddress::parse("dc.*.none").unwrap();
        assert_eq!(addr.steps[1], Step::Any);
    }

    #[test]
    fn test_element_truncation() {
        let addr = FieldAddress::parse("bundles.bundle$").unwrap();
        assert_eq!(addr.target, FieldTarget::ElementOnly);
        assert_eq!(addr.steps.len(), 2);

        // Dotted form of the truncation token
        let addr = FieldAddress::parse("bundles.bundle.$").unwrap();
        assert_eq!(addr.target, FieldTarget::ElementOnly);
        assert_eq!(addr.steps.len(), 2);
    }

    #[test]
    fn test_identity_address() {
        let addr = FieldAddress::parse(".").unwrap();
        assert!(addr.steps.is_empty());
        assert_eq!(addr.target, FieldTarget::ElementOnly);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(FieldAddress::parse("").is_err());
        assert!(FieldAddress::parse("a..b").is_err());
        assert!(FieldAddress::parse("a.b:").is_err());
        assert!(FieldAddress::parse("a.b$:f").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for name in ["dc.title:value", "dc.*.x:lang", "bundles.bundle$"] {
            let addr = FieldAddress::parse(name).unwrap();
            let again = FieldAddress::parse(&addr.to_string()).unwrap();
            assert_eq!(addr, again);
        }
    }
}
