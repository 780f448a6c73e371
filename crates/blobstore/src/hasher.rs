//! Content fingerprinting
//!
//! The hasher is injected into every backend so a deployment can pick MD5
//! (compact, matches legacy fingerprints) or SHA-256. Equal inputs always
//! yield equal fingerprints; fingerprint equality is treated as content
//! equality.

use sha2::{Digest, Sha256};

/// Computes the stable fingerprint of a canonical string form
pub trait ContentHasher: Send + Sync {
    /// Fingerprint of the content, lowercase hex
    fn fingerprint(&self, content: &str) -> String;

    /// Short algorithm name, for logs
    fn name(&self) -> &'static str;
}

/// MD5 fingerprints (32 hex characters)
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl ContentHasher for Md5Hasher {
    fn fingerprint(&self, content: &str) -> String {
        format!("{:x}", md5::compute(content.as_bytes()))
    }

    fn name(&self) -> &'static str {
        "md5"
    }
}

/// SHA-256 fingerprints (64 hex characters)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn fingerprint(&self, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn name(&self) -> &'static str {
        "sha256"
    }
}
