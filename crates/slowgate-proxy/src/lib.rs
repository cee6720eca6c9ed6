//! # SlowGate Proxy - logic indirection through a slow tree
//!
//! A [`ProxyRouter`] forwards business calls to whichever logic contract its
//! [`LogicRegistry`] slot names at the time of the call. The slot lives in a
//! shared [`SlowTree`](slowgate_tree::SlowTree), so swapping the logic is a
//! staged write that only takes effect after the tree's delay. There is no
//! fast path around it.
//!
//! ## Call flow
//!
//! ```text
//! admin -> init_slow_tree / propose_logic_change -> tree.stage (caller = proxy)
//! user  -> call_counter -> registry slot (proof-checked) -> LogicDispatch
//! user  -> call_public_counter -> registry slot (direct read) -> LogicDispatch
//! ```

#![forbid(unsafe_code)]

pub mod logic;
pub mod note;
pub mod registry;
pub mod router;

pub use logic::{CounterLogic, LogicContract, LogicDispatch};
pub use note::{compute_note_hash_and_nullifier, NoteHashes};
pub use registry::LogicRegistry;
pub use router::{ProxyRouter, SlowUpdateView};
