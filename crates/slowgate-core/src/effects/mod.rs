//! Host interface definitions
//!
//! Traits describing what the ledger host provides to contracts. Handlers live
//! outside the core; the in-memory handlers used by tests are in
//! `slowgate-testkit`.

pub mod storage;

pub use storage::{
    contract_key, load_state, store_state, StorageEffects, StorageError, CONTRACT_STATE_PREFIX,
};
