//! Size limits applied before storage

/// OAI identifiers are truncated to this many characters before storage
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Truncate an identifier to [`MAX_IDENTIFIER_LENGTH`] characters
///
/// Truncation counts characters, not bytes, so a multi-byte identifier is
/// never split inside a code point.
pub fn truncate_identifier(identifier: &str) -> &str {
    match identifier.char_indices().nth(MAX_IDENTIFIER_LENGTH) {
        Some((idx, _)) => &identifier[..idx],
        None => identifier,
    }
}
