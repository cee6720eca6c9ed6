//! # SlowGate Tree - delayed-visibility key-value store
//!
//! A versioned store keyed by [`Slot`](slowgate_core::Slot) where every write
//! is staged and only becomes the effective value after the tree's fixed
//! delay. The tree commits to all leaves with a sparse Merkle root so a
//! verifier holding only the root can check reads ([`verify_read`]).
//!
//! ## Semantics
//!
//! - `stage(slot, v)` at time `t` is observed by `read(slot, t')` exactly when
//!   `t' >= t + delay`.
//! - One pending change per slot; re-staging replaces a change that is not yet
//!   effective and restarts the clock.
//! - Untouched slots read as zero.
//! - Reads are pure; each entry point is a synchronous transition executed
//!   atomically by the host.

#![forbid(unsafe_code)]

pub mod leaf;
pub mod proof;
pub mod tree;

pub use leaf::{PendingChange, SlowLeaf};
pub use proof::{verify_read, SlowReadProof};
pub use tree::{SlowTree, StageReceipt, TreeSnapshot};
