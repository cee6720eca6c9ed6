//! Proxy router
//!
//! The proxy stores no logic address of its own. Every forwarding call reads
//! the authoritative address from its registry slot in the shared slow tree,
//! so a staged logic change is picked up by the first call after the delay.
//!
//! Lifecycle is one-way: `Uninitialized -> Initialized` through
//! `init_slow_tree`. Forwarding before that fails with `NotInitialized`.
//!
//! Every entry point is bound to the deployment: the call must be addressed
//! to this proxy and the tree handed in must be the one the proxy was
//! deployed against. Anything else is `Invalid`.

use crate::logic::LogicDispatch;
use crate::note::{self, NoteHashes};
use crate::registry::LogicRegistry;
use serde::{Deserialize, Serialize};
use slowgate_core::{Address, CallContext, Field, Result, Slot, SlowGateError, Timepoint};
use slowgate_tree::{SlowReadProof, SlowTree, StageReceipt};
use tracing::{debug, info, warn};

/// Logic state of a proxy as seen at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowUpdateView {
    /// Logic address effective now, if any
    pub current: Option<Address>,
    /// Staged logic address and the time it becomes effective
    pub pending: Option<(Address, Timepoint)>,
}

/// A proxy contract instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRouter {
    address: Address,
    admin: Address,
    tree: Address,
    bootstrap_logic: Address,
    counter: u64,
    registry: LogicRegistry,
}

impl ProxyRouter {
    /// Deploy a proxy at `address` that routes through the tree at `tree`.
    ///
    /// `bootstrap_logic` is the logic contract named at deployment. It is what
    /// `init_slow_tree` stages when no other logic is given, and it is not
    /// authoritative until then.
    pub fn new(address: Address, admin: Address, tree: Address, bootstrap_logic: Address) -> Result<Self> {
        for (name, value) in [
            ("proxy", address),
            ("admin", admin),
            ("tree", tree),
            ("logic", bootstrap_logic),
        ] {
            if value.is_zero() {
                return Err(SlowGateError::invalid(format!("{name} address must not be zero")));
            }
        }
        info!(proxy = %address, %admin, %tree, logic = %bootstrap_logic, "Proxy deployed");
        Ok(Self {
            address,
            admin,
            tree,
            bootstrap_logic,
            counter: 0,
            registry: LogicRegistry::new(address),
        })
    }

    /// Address of this proxy
    pub fn address(&self) -> Address {
        self.address
    }

    /// Administrator allowed to initialize and propose
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Address of the shared tree this proxy routes through
    pub fn tree(&self) -> Address {
        self.tree
    }

    /// Logic contract named at deployment; the default for `init_slow_tree`
    pub fn bootstrap_logic(&self) -> Address {
        self.bootstrap_logic
    }

    /// The proxy's logic registry
    pub fn registry(&self) -> &LogicRegistry {
        &self.registry
    }

    /// True once `init_slow_tree` succeeded
    pub fn is_initialized(&self) -> bool {
        self.registry.is_initialized()
    }

    fn ensure_admin(&self, ctx: &CallContext, action: &str) -> Result<()> {
        if ctx.caller == self.admin {
            return Ok(());
        }
        warn!(proxy = %self.address, caller = %ctx.caller, action, "Rejected non-admin call");
        Err(SlowGateError::unauthorized(format!(
            "{} may not {action} on proxy {}",
            ctx.caller, self.address
        )))
    }

    fn ensure_addressed(&self, ctx: &CallContext) -> Result<()> {
        if ctx.this == self.address {
            Ok(())
        } else {
            Err(SlowGateError::invalid(format!(
                "call addressed to {} reached proxy {}",
                ctx.this, self.address
            )))
        }
    }

    fn ensure_tree(&self, tree: &SlowTree) -> Result<()> {
        if tree.address() == self.tree {
            return Ok(());
        }
        warn!(proxy = %self.address, expected = %self.tree, got = %tree.address(), "Rejected foreign tree");
        Err(SlowGateError::invalid(format!(
            "proxy {} routes through {}, not {}",
            self.address,
            self.tree,
            tree.address()
        )))
    }

    fn ensure_bound(&self, ctx: &CallContext, tree: &SlowTree) -> Result<()> {
        self.ensure_addressed(ctx)?;
        self.ensure_tree(tree)
    }

    /// Admin-only: stage `logic` (the bootstrap logic if `None`) in this
    /// proxy's registry slot.
    ///
    /// Returns the time from which forwarding succeeds.
    pub fn init_slow_tree(
        &mut self,
        ctx: &CallContext,
        tree: &mut SlowTree,
        logic: Option<Address>,
    ) -> Result<Timepoint> {
        self.ensure_bound(ctx, tree)?;
        self.ensure_admin(ctx, "initialize")?;
        let logic = logic.unwrap_or(self.bootstrap_logic);
        self.registry.init(&ctx.nested(self.tree), tree, logic)
    }

    /// Admin-only: stage a new logic address. It takes effect after the
    /// tree's delay.
    pub fn propose_logic_change(
        &self,
        ctx: &CallContext,
        tree: &mut SlowTree,
        new: Address,
    ) -> Result<StageReceipt> {
        self.ensure_bound(ctx, tree)?;
        self.ensure_admin(ctx, "propose a logic change")?;
        self.registry
            .propose_logic_change(&ctx.nested(self.tree), tree, new)
    }

    /// Forward `increment` to the logic effective at `ctx.now`, resolved
    /// through a membership proof against the root of the bound tree.
    ///
    /// With the whole tree in hand the proof and the root come from the same
    /// state; [`Self::call_counter_with_proof`] is the entry point for a
    /// caller that only holds a published root.
    pub fn call_counter(
        &mut self,
        ctx: &CallContext,
        tree: &SlowTree,
        dispatch: &dyn LogicDispatch,
    ) -> Result<u64> {
        self.ensure_bound(ctx, tree)?;
        let slot = self.initialized_slot()?;
        let proof = tree.prove(slot)?;
        self.call_counter_with_proof(ctx, &tree.root(), &proof, dispatch)
    }

    /// Forward `increment` to the logic that `proof` shows in this proxy's
    /// slot under `root`.
    ///
    /// `root` must be the published root of the proxy's tree, obtained by the
    /// host independently of `proof`. A proof that does not open to it is
    /// `ProofRejected`.
    pub fn call_counter_with_proof(
        &mut self,
        ctx: &CallContext,
        root: &Field,
        proof: &SlowReadProof,
        dispatch: &dyn LogicDispatch,
    ) -> Result<u64> {
        self.ensure_addressed(ctx)?;
        let logic = self.registry.verified_logic(root, proof, ctx.now)?;
        self.forward(ctx, logic, dispatch)
    }

    /// Forward `increment` to the logic effective at `ctx.now`, read directly
    /// from the tree.
    pub fn call_public_counter(
        &mut self,
        ctx: &CallContext,
        tree: &SlowTree,
        dispatch: &dyn LogicDispatch,
    ) -> Result<u64> {
        self.ensure_bound(ctx, tree)?;
        let logic = self.registry.current_logic(tree, ctx.now)?;
        self.forward(ctx, logic, dispatch)
    }

    fn initialized_slot(&self) -> Result<Slot> {
        self.registry.slot().ok_or_else(|| {
            SlowGateError::not_initialized(format!("proxy {} not initialized", self.address))
        })
    }

    fn forward(&mut self, ctx: &CallContext, logic: Address, dispatch: &dyn LogicDispatch) -> Result<u64> {
        let next = dispatch.increment(&ctx.nested(logic), &logic, self.counter)?;
        debug!(
            proxy = %self.address,
            %logic,
            at = ctx.now.units(),
            previous = self.counter,
            next,
            "Forwarded counter call"
        );
        self.counter = next;
        Ok(next)
    }

    /// Counter value written by the last forwarded call
    pub fn get_count(&self) -> u64 {
        self.counter
    }

    /// Effective and pending logic addresses at `at`
    pub fn get_slow_update(&self, tree: &SlowTree, at: Timepoint) -> Result<SlowUpdateView> {
        self.ensure_tree(tree)?;
        if !self.registry.is_initialized() {
            return Ok(SlowUpdateView {
                current: None,
                pending: None,
            });
        }
        let current = match self.registry.current_logic(tree, at) {
            Ok(logic) => Some(logic),
            Err(SlowGateError::NotInitialized { .. }) => None,
            Err(err) => return Err(err),
        };
        Ok(SlowUpdateView {
            current,
            pending: self.registry.pending(tree, at)?,
        })
    }

    /// Note hashing hook exposed by the proxy
    pub fn compute_note_hash_and_nullifier(
        contract: &Address,
        nonce: &Field,
        storage_slot: &Field,
        fields: &[Field],
    ) -> Result<NoteHashes> {
        note::compute_note_hash_and_nullifier(contract, nonce, storage_slot, fields)
    }
}
