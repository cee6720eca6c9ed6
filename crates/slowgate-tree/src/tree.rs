//! The delayed-update tree
//!
//! A write never overwrites the effective value. It stages a pending value
//! that reads observe once `delay` time units have passed. There is no apply
//! step: the switch happens implicitly in `read`.
//!
//! Policy decisions pinned by tests:
//! - Re-staging a slot whose change is still pending replaces that change and
//!   restarts the clock (last-staged-wins). The replaced value is never
//!   observable.
//! - Staging the value that is already effective still restarts the clock.
//! - A staged change cannot be withdrawn.

use crate::leaf::{PendingChange, SlowLeaf};
use crate::proof::SlowReadProof;
use serde::{Deserialize, Serialize};
use slowgate_core::config::{SlowGateConfig, SlowTreeConfig};
use slowgate_core::crypto::SparseMerkleTree;
use slowgate_core::{
    Address, CallContext, Delay, Field, Result, Slot, SlotScope, SlowGateError, Timepoint,
    WriteAuthority, WriterPolicy,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Record of one accepted `stage` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReceipt {
    /// Slot written
    pub slot: Slot,
    /// Value staged
    pub value: Field,
    /// Caller that staged it
    pub staged_by: Address,
    /// Host time of the stage
    pub staged_at: Timepoint,
    /// First time reads observe `value`
    pub effective_at: Timepoint,
    /// A not-yet-effective change that this stage overwrote
    pub replaced: Option<PendingChange>,
}

/// Delayed-update key-value tree with a Merkle root over all leaves
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "TreeSnapshot", try_from = "TreeSnapshot")]
pub struct SlowTree {
    address: Address,
    delay: Delay,
    policy: WriterPolicy,
    leaves: BTreeMap<Slot, SlowLeaf>,
    merkle: SparseMerkleTree,
}

impl SlowTree {
    /// Deploy a tree at `address` from its configuration. `policy` decides
    /// who may stage.
    pub fn new(address: Address, config: &SlowTreeConfig, policy: WriterPolicy) -> Result<Self> {
        config.validate()?;
        if address.is_zero() {
            return Err(SlowGateError::invalid("tree address must not be zero"));
        }
        let merkle = SparseMerkleTree::new(config.depth, SlowLeaf::default().commitment())?;
        let mut tree = Self {
            address,
            delay: config.delay_period(),
            policy,
            leaves: BTreeMap::new(),
            merkle,
        };
        for initial in &config.initial_leaves {
            tree.put_leaf(initial.slot, SlowLeaf::settled(initial.value))?;
        }
        info!(
            tree = %address,
            depth = config.depth,
            delay = config.delay,
            leaves = config.initial_leaves.len(),
            "Slow tree deployed"
        );
        Ok(tree)
    }

    /// Address the tree was deployed at
    pub fn address(&self) -> Address {
        self.address
    }

    /// Delay applied to every staged change
    pub fn delay(&self) -> Delay {
        self.delay
    }

    /// Merkle depth
    pub fn depth(&self) -> u8 {
        self.merkle.depth()
    }

    /// Current write policy
    pub fn policy(&self) -> &WriterPolicy {
        &self.policy
    }

    /// Root commitment over every leaf
    pub fn root(&self) -> Field {
        Field::new(self.merkle.root())
    }

    fn check_slot(&self, slot: Slot) -> Result<()> {
        if self.merkle.contains_index(slot.index()) {
            Ok(())
        } else {
            Err(SlowGateError::invalid(format!(
                "{slot} outside tree of depth {}",
                self.depth()
            )))
        }
    }

    fn ensure_addressed(&self, ctx: &CallContext) -> Result<()> {
        if ctx.this == self.address {
            Ok(())
        } else {
            Err(SlowGateError::invalid(format!(
                "call addressed to {} reached tree {}",
                ctx.this, self.address
            )))
        }
    }

    fn put_leaf(&mut self, slot: Slot, leaf: SlowLeaf) -> Result<()> {
        self.merkle.set_leaf(slot.index(), leaf.commitment())?;
        if leaf.is_touched() {
            self.leaves.insert(slot, leaf);
        } else {
            self.leaves.remove(&slot);
        }
        Ok(())
    }

    /// Stage `value` for `slot`. It becomes effective at `ctx.now + delay`.
    pub fn stage(&mut self, ctx: &CallContext, slot: Slot, value: Field) -> Result<StageReceipt> {
        self.ensure_addressed(ctx)?;
        self.check_slot(slot)?;
        if let Err(err) = self.policy.ensure_may_write(&ctx.caller, slot) {
            warn!(caller = %ctx.caller, %slot, "Rejected stage from unauthorized caller");
            return Err(err);
        }
        let effective_at = ctx.now.checked_add(self.delay)?;

        let mut leaf = self.leaf(slot);
        leaf.fold(ctx.now);
        let replaced = leaf.pending.take();
        leaf.pending = Some(PendingChange {
            value,
            effective_at,
        });
        self.put_leaf(slot, leaf)?;

        info!(
            %slot,
            %value,
            staged_by = %ctx.caller,
            staged_at = ctx.now.units(),
            effective_at = effective_at.units(),
            replaced = replaced.is_some(),
            "Staged slow update"
        );

        Ok(StageReceipt {
            slot,
            value,
            staged_by: ctx.caller,
            staged_at: ctx.now,
            effective_at,
            replaced,
        })
    }

    /// Effective value of `slot` at time `at`. Untouched slots read as zero.
    pub fn read(&self, slot: Slot, at: Timepoint) -> Result<Field> {
        self.check_slot(slot)?;
        let value = self.leaf(slot).value_at(at);
        debug!(%slot, at = at.units(), %value, "Slow tree read");
        Ok(value)
    }

    /// Stored leaf for `slot` (the default leaf if untouched)
    pub fn leaf(&self, slot: Slot) -> SlowLeaf {
        self.leaves.get(&slot).copied().unwrap_or_default()
    }

    /// The change pending on `slot` that is not yet effective at `at`
    pub fn pending(&self, slot: Slot, at: Timepoint) -> Result<Option<PendingChange>> {
        self.check_slot(slot)?;
        Ok(self.leaf(slot).pending_at(at))
    }

    /// Slots that have ever been written, in order
    pub fn touched_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.leaves.keys().copied()
    }

    /// Membership proof of `slot`'s leaf against [`Self::root`]
    pub fn prove(&self, slot: Slot) -> Result<SlowReadProof> {
        self.check_slot(slot)?;
        Ok(SlowReadProof {
            slot,
            leaf: self.leaf(slot),
            membership: self.merkle.prove(slot.index())?,
        })
    }

    fn ensure_admin(&self, caller: &Address) -> Result<()> {
        if self.policy.is_admin(caller) {
            Ok(())
        } else {
            Err(SlowGateError::unauthorized(format!(
                "{caller} is not the tree admin"
            )))
        }
    }

    /// Admin-only: let `writer` stage changes to the slots in `scope`
    pub fn grant_writer(&mut self, ctx: &CallContext, writer: Address, scope: SlotScope) -> Result<()> {
        self.ensure_addressed(ctx)?;
        self.ensure_admin(&ctx.caller)?;
        self.policy.grant(writer, scope)?;
        info!(%writer, "Granted slow tree write access");
        Ok(())
    }

    /// Admin-only: drop every grant held by `writer`
    pub fn revoke_writer(&mut self, ctx: &CallContext, writer: &Address) -> Result<bool> {
        self.ensure_addressed(ctx)?;
        self.ensure_admin(&ctx.caller)?;
        let existed = self.policy.revoke(writer);
        info!(%writer, existed, "Revoked slow tree write access");
        Ok(existed)
    }
}

/// Persisted form of a [`SlowTree`]; the Merkle nodes are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Deployment address
    pub address: Address,
    /// Merkle depth
    pub depth: u8,
    /// Delay applied to staged changes
    pub delay: Delay,
    /// Write policy
    pub policy: WriterPolicy,
    /// Touched leaves in slot order
    pub leaves: Vec<(Slot, SlowLeaf)>,
}

impl From<SlowTree> for TreeSnapshot {
    fn from(tree: SlowTree) -> Self {
        Self {
            address: tree.address,
            depth: tree.depth(),
            delay: tree.delay,
            policy: tree.policy,
            leaves: tree.leaves.into_iter().collect(),
        }
    }
}

impl TryFrom<TreeSnapshot> for SlowTree {
    type Error = SlowGateError;

    fn try_from(snapshot: TreeSnapshot) -> Result<Self> {
        if snapshot.delay.units() == 0 {
            return Err(SlowGateError::invalid("snapshot delay must be at least 1"));
        }
        if snapshot.address.is_zero() {
            return Err(SlowGateError::invalid("snapshot tree address must not be zero"));
        }
        let merkle = SparseMerkleTree::new(snapshot.depth, SlowLeaf::default().commitment())?;
        let mut tree = Self {
            address: snapshot.address,
            delay: snapshot.delay,
            policy: snapshot.policy,
            leaves: BTreeMap::new(),
            merkle,
        };
        for (slot, leaf) in snapshot.leaves {
            tree.check_slot(slot)?;
            tree.put_leaf(slot, leaf)?;
        }
        Ok(tree)
    }
}
