//! Hashing and commitment primitives

pub mod hash;
pub mod merkle;

pub use hash::{hash, hash_domain, hasher, HashAlgorithm, Hasher, ALGORITHM};
pub use merkle::{
    compute_root, verify_membership, MembershipProof, MerkleValidationError, SparseMerkleTree,
    MAX_MERKLE_DEPTH,
};
