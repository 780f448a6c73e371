//! XOAI document model and format transformation
//!
//! Harvested metadata arrives as XOAI XML: nested `<element name="...">`
//! nodes with `<field name="...">` leaves. This crate provides:
//!
//! - [`RecordDocument`]: a mutable DOM tied to an OAI identifier, with
//!   dotted field addressing (`a.b.c:field`, `*` wildcards, `$` element
//!   truncation) for reading, adding, removing, and replacing field
//!   occurrences;
//! - bitstream interpretation of the `bundles` subtree;
//! - a transformer registry mapping `(source_format, target_format)` pairs
//!   to parameterized document transformers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod bitstream;
pub mod document;
pub mod namespaces;
pub mod transform;

pub use address::{FieldAddress, FieldTarget, Step};
pub use bitstream::Bitstream;
pub use document::RecordDocument;
pub use transform::{
    bind_parameters, encode_list_parameter, FieldMapRule, FieldMapTransformer, FormatTransformer,
    ParamValue, TransformerParameters, TransformerRegistry,
};
