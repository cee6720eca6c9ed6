//! Proof-carrying reads
//!
//! A verifier that only knows the published root can evaluate a slot at any
//! time from a [`SlowReadProof`]: the leaf commitment ties `(current,
//! pending)` to the root, and the effective value follows from the leaf alone.

use crate::leaf::SlowLeaf;
use serde::{Deserialize, Serialize};
use slowgate_core::crypto::{compute_root, MembershipProof};
use slowgate_core::{Field, Result, Slot, SlowGateError, Timepoint};

/// A leaf together with its membership proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowReadProof {
    /// Slot the proof is about
    pub slot: Slot,
    /// Claimed leaf contents
    pub leaf: SlowLeaf,
    /// Sibling path from the leaf to the root
    pub membership: MembershipProof,
}

/// Verify `proof` against `root` and return the slot's value at `at`.
pub fn verify_read(root: &Field, proof: &SlowReadProof, at: Timepoint) -> Result<Field> {
    proof
        .membership
        .validate()
        .map_err(|e| SlowGateError::proof_rejected(e.to_string()))?;

    if proof.membership.leaf_index != proof.slot.index() {
        return Err(SlowGateError::proof_rejected(format!(
            "proof is for leaf {} but claims {}",
            proof.membership.leaf_index, proof.slot
        )));
    }

    let computed = compute_root(&proof.membership, &proof.leaf.commitment());
    if computed != *root.as_bytes() {
        return Err(SlowGateError::proof_rejected(format!(
            "leaf for {} does not match root {root}",
            proof.slot
        )));
    }

    Ok(proof.leaf.value_at(at))
}
