//! Fixed-depth sparse Merkle tree
//!
//! Leaves are addressed by index in `[0, 2^depth)`. Untouched subtrees hash to
//! precomputed "zero" digests, so only the paths of written leaves are stored.
//! Interior nodes are `H(left || right)`.

use crate::crypto::hash::hash;
use crate::{Result, SlowGateError};
use std::collections::HashMap;

/// Maximum depth of a tree (leaf indices are `u64`)
pub const MAX_MERKLE_DEPTH: u8 = 64;

/// Membership proof: the sibling digests from leaf to root
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MembershipProof {
    /// Path of sibling hashes from leaf level upward
    pub sibling_path: Vec<[u8; 32]>,
    /// Index of the proven leaf
    pub leaf_index: u64,
}

/// Errors that can occur during Merkle proof validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleValidationError {
    #[error("Sibling path length {actual} exceeds maximum depth {max}")]
    PathTooLong { actual: usize, max: u8 },

    #[error("Sibling path is empty")]
    EmptyPath,

    #[error("Leaf index {index} is out of bounds for depth {depth}")]
    LeafIndexOutOfBounds { index: u64, depth: usize },
}

impl MembershipProof {
    /// Depth of the tree this proof was generated from
    pub fn depth(&self) -> usize {
        self.sibling_path.len()
    }

    /// Validate proof invariants after deserialization.
    pub fn validate(&self) -> std::result::Result<(), MerkleValidationError> {
        let depth = self.sibling_path.len();
        if depth > MAX_MERKLE_DEPTH as usize {
            return Err(MerkleValidationError::PathTooLong {
                actual: depth,
                max: MAX_MERKLE_DEPTH,
            });
        }
        if depth == 0 {
            return Err(MerkleValidationError::EmptyPath);
        }
        if depth < 64 && self.leaf_index >= (1u64 << depth) {
            return Err(MerkleValidationError::LeafIndexOutOfBounds {
                index: self.leaf_index,
                depth,
            });
        }
        Ok(())
    }
}

fn combine(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    hash(&combined)
}

/// Recompute the root implied by `proof` for `leaf_hash`.
pub fn compute_root(proof: &MembershipProof, leaf_hash: &[u8; 32]) -> [u8; 32] {
    let mut current = *leaf_hash;
    let mut index = proof.leaf_index;
    for sibling in &proof.sibling_path {
        current = if index & 1 == 0 {
            combine(&current, sibling)
        } else {
            combine(sibling, &current)
        };
        index >>= 1;
    }
    current
}

/// Verify that `leaf_hash` sits at `proof.leaf_index` under `root`.
pub fn verify_membership(proof: &MembershipProof, root: &[u8; 32], leaf_hash: &[u8; 32]) -> bool {
    if proof.validate().is_err() {
        return false;
    }
    &compute_root(proof, leaf_hash) == root
}

/// Sparse Merkle tree of fixed depth
#[derive(Debug, Clone)]
pub struct SparseMerkleTree {
    depth: u8,
    /// `zero_hashes[l]` is the digest of an empty subtree rooted at level `l`
    zero_hashes: Vec<[u8; 32]>,
    /// Non-empty nodes keyed by `(level, index)`; level 0 holds leaves
    nodes: HashMap<(u8, u64), [u8; 32]>,
}

impl SparseMerkleTree {
    /// Create an empty tree whose unwritten leaves hash to `empty_leaf`.
    pub fn new(depth: u8, empty_leaf: [u8; 32]) -> Result<Self> {
        if depth == 0 || depth > MAX_MERKLE_DEPTH {
            return Err(SlowGateError::invalid(format!(
                "merkle depth {depth} outside 1..={MAX_MERKLE_DEPTH}"
            )));
        }
        let mut zero_hashes = Vec::with_capacity(depth as usize + 1);
        zero_hashes.push(empty_leaf);
        for level in 0..depth as usize {
            let below = zero_hashes[level];
            zero_hashes.push(combine(&below, &below));
        }
        Ok(Self {
            depth,
            zero_hashes,
            nodes: HashMap::new(),
        })
    }

    /// Tree depth
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// True if `index` addresses a leaf of this tree
    pub fn contains_index(&self, index: u64) -> bool {
        self.depth >= 64 || index < (1u64 << self.depth)
    }

    fn check_index(&self, index: u64) -> Result<()> {
        if self.contains_index(index) {
            Ok(())
        } else {
            Err(SlowGateError::invalid(format!(
                "leaf index {index} out of range for depth {}",
                self.depth
            )))
        }
    }

    fn node(&self, level: u8, index: u64) -> [u8; 32] {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zero_hashes[level as usize])
    }

    fn put(&mut self, level: u8, index: u64, digest: [u8; 32]) {
        if digest == self.zero_hashes[level as usize] {
            self.nodes.remove(&(level, index));
        } else {
            self.nodes.insert((level, index), digest);
        }
    }

    /// Current root commitment
    pub fn root(&self) -> [u8; 32] {
        self.node(self.depth, 0)
    }

    /// Digest currently stored at leaf `index`
    pub fn leaf(&self, index: u64) -> Result<[u8; 32]> {
        self.check_index(index)?;
        Ok(self.node(0, index))
    }

    /// Overwrite leaf `index` and rehash its path to the root.
    pub fn set_leaf(&mut self, index: u64, leaf_hash: [u8; 32]) -> Result<()> {
        self.check_index(index)?;
        self.put(0, index, leaf_hash);

        let mut idx = index;
        for level in 0..self.depth {
            let left = self.node(level, idx & !1);
            let right = self.node(level, idx | 1);
            idx >>= 1;
            self.put(level + 1, idx, combine(&left, &right));
        }
        Ok(())
    }

    /// Membership proof for leaf `index` (written or not)
    pub fn prove(&self, index: u64) -> Result<MembershipProof> {
        self.check_index(index)?;
        let mut sibling_path = Vec::with_capacity(self.depth as usize);
        let mut idx = index;
        for level in 0..self.depth {
            sibling_path.push(self.node(level, idx ^ 1));
            idx >>= 1;
        }
        Ok(MembershipProof {
            sibling_path,
            leaf_index: index,
        })
    }

    /// Number of stored non-empty leaves
    pub fn occupied_leaves(&self) -> usize {
        self.nodes.keys().filter(|(level, _)| *level == 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> [u8; 32] {
        hash(&[n])
    }

    #[test]
    fn test_rejects_bad_depth() {
        assert!(SparseMerkleTree::new(0, [0u8; 32]).is_err());
        assert!(SparseMerkleTree::new(65, [0u8; 32]).is_err());
        assert!(SparseMerkleTree::new(64, [0u8; 32]).is_ok());
    }

    #[test]
    fn test_empty_root_matches_zero_chain() {
        let tree = SparseMerkleTree::new(2, [0u8; 32]).unwrap();
        let l1 = combine(&[0u8; 32], &[0u8; 32]);
        assert_eq!(tree.root(), combine(&l1, &l1));
    }

    #[test]
    fn test_root_matches_dense_construction() {
        let mut tree = SparseMerkleTree::new(2, [0u8; 32]).unwrap();
        tree.set_leaf(1, leaf(1)).unwrap();
        tree.set_leaf(2, leaf(2)).unwrap();

        let left = combine(&[0u8; 32], &leaf(1));
        let right = combine(&leaf(2), &[0u8; 32]);
        assert_eq!(tree.root(), combine(&left, &right));
    }

    #[test]
    fn test_proofs_verify_for_written_and_empty_leaves() {
        let mut tree = SparseMerkleTree::new(8, [0u8; 32]).unwrap();
        tree.set_leaf(5, leaf(5)).unwrap();
        tree.set_leaf(200, leaf(200)).unwrap();
        let root = tree.root();

        let proof = tree.prove(5).unwrap();
        assert!(verify_membership(&proof, &root, &leaf(5)));
        assert!(!verify_membership(&proof, &root, &leaf(6)));

        let empty = tree.prove(17).unwrap();
        assert!(verify_membership(&empty, &root, &[0u8; 32]));
    }

    #[test]
    fn test_resetting_leaf_restores_root_and_sparsity() {
        let mut tree = SparseMerkleTree::new(16, [0u8; 32]).unwrap();
        let empty_root = tree.root();
        tree.set_leaf(1234, leaf(9)).unwrap();
        assert_ne!(tree.root(), empty_root);
        assert_eq!(tree.occupied_leaves(), 1);

        tree.set_leaf(1234, [0u8; 32]).unwrap();
        assert_eq!(tree.root(), empty_root);
        assert_eq!(tree.occupied_leaves(), 0);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut tree = SparseMerkleTree::new(4, [0u8; 32]).unwrap();
        assert!(tree.set_leaf(16, leaf(1)).is_err());
        assert!(tree.prove(16).is_err());
        assert!(tree.set_leaf(15, leaf(1)).is_ok());
    }

    #[test]
    fn test_full_width_tree_accepts_max_index() {
        let mut tree = SparseMerkleTree::new(64, [0u8; 32]).unwrap();
        tree.set_leaf(u64::MAX, leaf(3)).unwrap();
        let proof = tree.prove(u64::MAX).unwrap();
        assert_eq!(proof.depth(), 64);
        assert!(verify_membership(&proof, &tree.root(), &leaf(3)));
    }

    #[test]
    fn test_validate_rejects_malformed_proofs() {
        let proof = MembershipProof {
            sibling_path: vec![[0u8; 32]; 2],
            leaf_index: 4,
        };
        assert_eq!(
            proof.validate(),
            Err(MerkleValidationError::LeafIndexOutOfBounds { index: 4, depth: 2 })
        );

        let empty = MembershipProof {
            sibling_path: Vec::new(),
            leaf_index: 0,
        };
        assert_eq!(empty.validate(), Err(MerkleValidationError::EmptyPath));
    }

    proptest::proptest! {
        #[test]
        fn prop_root_independent_of_write_order(
            writes in proptest::collection::btree_map(0u64..1024, proptest::prelude::any::<u8>(), 1..24)
        ) {
            let mut forward = SparseMerkleTree::new(10, [0u8; 32]).unwrap();
            let mut backward = SparseMerkleTree::new(10, [0u8; 32]).unwrap();
            for (index, n) in &writes {
                forward.set_leaf(*index, leaf(*n)).unwrap();
            }
            for (index, n) in writes.iter().rev() {
                backward.set_leaf(*index, leaf(*n)).unwrap();
            }
            proptest::prop_assert_eq!(forward.root(), backward.root());

            let root = forward.root();
            for (index, n) in &writes {
                let proof = forward.prove(*index).unwrap();
                proptest::prop_assert!(verify_membership(&proof, &root, &leaf(*n)));
            }
        }
    }
}
