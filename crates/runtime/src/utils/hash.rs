//! Hashing utilities for persisted documents.

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as 64 lowercase hex characters.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// First 8 hex characters of a fingerprint, for compact logging.
pub fn short(fingerprint: &str) -> &str {
    fingerprint.get(..8).unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        assert_eq!(sha256_hex(b"sheet"), sha256_hex(b"sheet"));
        assert_ne!(sha256_hex(b"sheet"), sha256_hex(b"sheets"));
    }

    #[test]
    fn test_hash_format() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(short(&hash), "e3b0c442");
        assert_eq!(short("abc"), "abc");
    }
}
