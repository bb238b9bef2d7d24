//! Checksum utilities for schema bytes
//!
//! The registry hashes the exact extracted text, so two submissions are the
//! same schema if and only if their checksums match.

use sha2::{Sha256, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum for schema content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum of rendered schema text
    pub fn from_text(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that bytes match this checksum
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::from_bytes(data) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = "syntax = \"proto3\";\npackage gen;\nmessage record {\n}\n";
        assert_eq!(Checksum::from_text(content), Checksum::from_text(content));
    }

    #[test]
    fn test_checksum_is_whitespace_sensitive() {
        let a = Checksum::from_text("message record {\n}\n");
        let b = Checksum::from_text("message record {\n}");
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::from_bytes(&[0x9, 0x7, 0x5]);
        assert!(checksum.verify(&[0x9, 0x7, 0x5]));
        assert!(!checksum.verify(&[0x9, 0x7]));
        assert_eq!(checksum.as_str().len(), 64);
    }
}
