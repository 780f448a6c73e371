//! Namespace constants of the XOAI serialization
//!
//! The fixed set is declared once on a new document's root and reused for
//! every evaluation; matching is by local name, so parsed documents keep
//! whatever declarations they arrived with.

/// XOAI container namespace
pub const XOAI_NS: &str = "http://www.lyncode.com/xoai";

/// Dublin Core elements
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// OAI Dublin Core container
pub const OAI_DC_NS: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";

/// OAI-PMH envelope
pub const OAI_PMH_NS: &str = "http://www.openarchives.org/OAI/2.0/";

/// XML Schema instance
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Build the declaration set for a new document root
pub(crate) fn default_namespaces() -> xmltree::Namespace {
    let mut ns = xmltree::Namespace::empty();
    ns.put("", XOAI_NS);
    ns.put("dc", DC_NS);
    ns.put("oai_dc", OAI_DC_NS);
    ns.put("xsi", XSI_NS);
    ns
}
