//! Per-call execution context supplied by the host ledger

use crate::{Address, Timepoint};
use serde::{Deserialize, Serialize};

/// What the host tells a contract about the call being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Authenticated identity of the immediate caller
    pub caller: Address,
    /// Host time at which the transaction executes
    pub now: Timepoint,
    /// Address of the contract being executed
    pub this: Address,
}

impl CallContext {
    /// Create a context for a top-level call into `this`
    pub fn new(caller: Address, now: Timepoint, this: Address) -> Self {
        Self { caller, now, this }
    }

    /// Context for a nested call from this contract into `callee`.
    ///
    /// The callee sees this contract as its caller, within the same transaction
    /// time.
    pub fn nested(&self, callee: Address) -> Self {
        Self {
            caller: self.this,
            now: self.now,
            this: callee,
        }
    }
}
