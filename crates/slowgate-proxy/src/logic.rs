//! Logic contracts the proxy forwards to
//!
//! The proxy never links against a concrete logic implementation. It asks the
//! host to run `increment` on whatever contract lives at the resolved address
//! through [`LogicDispatch`].

use serde::{Deserialize, Serialize};
use slowgate_core::{Address, CallContext, Result, SlowGateError};
use std::collections::BTreeMap;
use tracing::debug;

/// Business interface implemented by logic contracts
pub trait CounterLogic {
    /// Compute the next counter value from `current`
    fn increment(&self, ctx: &CallContext, current: u64) -> Result<u64>;
}

/// Host capability: run a logic contract by address
pub trait LogicDispatch {
    /// Run `increment` on the logic contract at `logic`.
    ///
    /// Fails with `NotFound` if no logic contract is deployed there.
    fn increment(&self, ctx: &CallContext, logic: &Address, current: u64) -> Result<u64>;
}

/// Stock counter logic: adds a fixed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicContract {
    /// Amount added per call
    pub step: u64,
}

impl LogicContract {
    /// Logic that adds `step` on every call
    pub fn new(step: u64) -> Self {
        Self { step }
    }
}

impl Default for LogicContract {
    fn default() -> Self {
        Self::new(1)
    }
}

impl CounterLogic for LogicContract {
    fn increment(&self, ctx: &CallContext, current: u64) -> Result<u64> {
        let next = current.checked_add(self.step).ok_or_else(|| {
            SlowGateError::invalid(format!("counter overflow adding {} to {current}", self.step))
        })?;
        debug!(logic = %ctx.this, caller = %ctx.caller, current, next, "Counter incremented");
        Ok(next)
    }
}

impl<L: CounterLogic> LogicDispatch for BTreeMap<Address, L> {
    fn increment(&self, ctx: &CallContext, logic: &Address, current: u64) -> Result<u64> {
        self.get(logic)
            .ok_or_else(|| SlowGateError::not_found(format!("no logic contract at {logic}")))?
            .increment(ctx, current)
    }
}
