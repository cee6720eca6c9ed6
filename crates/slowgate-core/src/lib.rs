//! SlowGate Core - foundation for delayed-visibility governance
//!
//! Types and host interfaces shared by the delayed-update tree and the proxy
//! that routes through it. Nothing in this crate holds contract state.
//!
//! # Contents
//! - `Field`, `Address`, `Slot`, `Timepoint`, `Delay`: value and identifier types
//! - `crypto`: SHA-256 hashing and a fixed-depth sparse Merkle tree
//! - `authorization`: `WriteAuthority` predicate and the stock `WriterPolicy`
//! - `context`: per-call `CallContext` supplied by the host ledger
//! - `effects`: `StorageEffects`, the host's persistent key-value store
//! - `serialization`: canonical DAG-CBOR encoding for persisted state
//! - `config`: layered `SlowTreeConfig`

#![forbid(unsafe_code)]

/// Write authority predicates
pub mod authorization;

/// Layered configuration
pub mod config;

/// Per-call execution context
pub mod context;

/// Hashing and Merkle commitments
pub mod crypto;

/// Host interface definitions
pub mod effects;

/// Unified error handling
pub mod errors;

/// DAG-CBOR serialization (canonical format)
pub mod serialization;

/// Value and identifier types
pub mod types;

pub use authorization::{SlotScope, WriteAuthority, WriterPolicy};
pub use config::{SlowGateConfig, SlowTreeConfig};
pub use context::CallContext;
pub use errors::{Result, SlowGateError};
pub use types::{Address, Delay, Field, Slot, Timepoint};
