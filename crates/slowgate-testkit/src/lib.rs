//! SlowGate Testing Infrastructure
//!
//! In-memory ledger host and fixtures shared by the workspace's tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use slowgate_testkit::*;
//!
//! let stack = deploy_stack(100).unwrap();
//! stack.init().unwrap();
//! stack.sandbox.advance(100);
//! assert_eq!(stack.sandbox.call_counter(actor("user"), stack.proxy).unwrap(), 1);
//! ```

pub mod clock;
pub mod fixtures;
pub mod sandbox;
pub mod storage;

pub use clock::ManualClock;
pub use fixtures::{actor, deploy_stack, StackFixture, FIXTURE_DEPTH};
pub use sandbox::{ContractKind, Sandbox};
pub use storage::MemoryStorageHandler;

use tracing_subscriber::EnvFilter;

/// Install a test-friendly `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
