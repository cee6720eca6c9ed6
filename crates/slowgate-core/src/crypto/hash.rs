//! Pure synchronous hashing for commitments and content addressing
//!
//! Hashing is deterministic and side-effect free, so it is a plain function
//! rather than a host interface. The algorithm is selected once via the
//! `ALGORITHM` constant; tree roots, leaf encodings and note hashes all go
//! through `hash()` / `hasher()` and change together if it is swapped.
//!
//! Current algorithm: **SHA-256** (32-byte output)
//!
//! ```ignore
//! use slowgate_core::crypto::hash::{hash, hasher};
//!
//! let digest = hash(b"hello world");
//!
//! let mut h = hasher();
//! h.update(b"hello");
//! h.update(b" world");
//! assert_eq!(h.finalize(), digest);
//! ```

use sha2::{Digest, Sha256};
use std::fmt;

/// Synchronous trait for cryptographic hashing
pub trait HashAlgorithm: Send + Sync + fmt::Debug {
    /// Hash arbitrary bytes to a 32-byte digest
    fn hash(&self, data: &[u8]) -> [u8; 32];

    /// Create an incremental hasher for multi-part hashing
    fn hasher(&self) -> Box<dyn Hasher>;
}

/// Trait for incremental hashing of multi-part data
pub trait Hasher: Send {
    /// Update the hasher with more data
    fn update(&mut self, data: &[u8]);

    /// Finalize the hasher and return the 32-byte digest
    fn finalize(self: Box<Self>) -> [u8; 32];
}

/// SHA-256 hash implementation
#[derive(Debug, Clone, Copy)]
pub struct Sha256Algorithm;

impl HashAlgorithm for Sha256Algorithm {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.finalize().into()
    }

    fn hasher(&self) -> Box<dyn Hasher> {
        Box::new(Sha256Hasher(Sha256::new()))
    }
}

struct Sha256Hasher(Sha256);

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> [u8; 32] {
        self.0.finalize().into()
    }
}

/// The hash algorithm used throughout SlowGate.
pub const ALGORITHM: Sha256Algorithm = Sha256Algorithm;

/// Hash bytes with the global algorithm
#[inline]
pub fn hash(data: &[u8]) -> [u8; 32] {
    ALGORITHM.hash(data)
}

/// Create an incremental hasher using the global algorithm
#[inline]
pub fn hasher() -> Box<dyn Hasher> {
    ALGORITHM.hasher()
}

/// Hash a sequence of parts under a 4-byte big-endian domain tag.
///
/// Output is `H(tag_be || part_0 || part_1 || ...)`. Parts are concatenated
/// without length prefixes, so callers must only pass fixed-width parts.
pub fn hash_domain(domain: u32, parts: &[&[u8]]) -> [u8; 32] {
    let mut h = hasher();
    h.update(&domain.to_be_bytes());
    for part in parts {
        h.update(part);
    }
    h.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_determinism() {
        assert_eq!(hash(b"slow tree"), hash(b"slow tree"));
    }

    #[test]
    fn test_incremental_hasher_equivalence() {
        let direct = hash(b"hello world");

        let mut h = hasher();
        h.update(b"hello");
        h.update(b" ");
        h.update(b"world");

        assert_eq!(direct, h.finalize());
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA256("") = e3b0c442...b855
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash(b"").to_vec(), expected);
    }

    #[test]
    fn test_domain_tag_separates_outputs() {
        let parts: [&[u8]; 1] = [&[7u8; 32]];
        assert_ne!(hash_domain(1, &parts), hash_domain(2, &parts));
    }

    #[test]
    fn test_domain_hash_matches_manual_concatenation() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let mut manual = Vec::new();
        manual.extend_from_slice(&9u32.to_be_bytes());
        manual.extend_from_slice(&a);
        manual.extend_from_slice(&b);
        assert_eq!(hash_domain(9, &[&a[..], &b[..]]), hash(&manual));
    }
}
