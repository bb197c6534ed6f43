//! # Hashing Utilities
//!
//! Two hash functions, two jobs:
//!
//! - **SHA-256**: derives deposit addresses. The derivation mirrors the
//!   content-addressed contract deployment scheme external ledgers use, so
//!   it sticks to the hash those ledgers can reproduce.
//! - **BLAKE3**: keys the pool's internal tables (account keys). Nothing
//!   outside the pool needs to recompute these, so we use the faster hash
//!   and BLAKE3's native domain separation.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    sha256_multi(&[data])
}

/// SHA-256 over several byte slices fed sequentially, without building a
/// concatenated buffer first. Equal to hashing the concatenation.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// `domain_separated_hash("a", data)` and `domain_separated_hash("b", data)`
/// never collide: the context string selects a different internal IV.
pub fn domain_separated_hash(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        let hash = sha256_array(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn sha256_multi_equals_concatenation() {
        let multi = sha256_multi(&[b"hello", b" ", b"world"]);
        assert_eq!(multi, sha256_array(b"hello world"));
    }

    #[test]
    fn blake3_deterministic() {
        assert_eq!(blake3_hash(b"pool"), blake3_hash(b"pool"));
        assert_ne!(blake3_hash(b"pool"), blake3_hash(b"Pool"));
    }

    #[test]
    fn test_domain_separation() {
        let data: &[u8] = b"same data";
        let a = domain_separated_hash("context-a", &[data]);
        let b = domain_separated_hash("context-b", &[data]);
        assert_ne!(a, b);
        assert_ne!(a, blake3_hash(data));
    }

    #[test]
    fn domain_separated_parts_equal_concatenation() {
        let split = domain_separated_hash("ctx", &[b"ab", b"cd"]);
        let whole = domain_separated_hash("ctx", &[b"abcd"]);
        assert_eq!(split, whole);
    }
}
