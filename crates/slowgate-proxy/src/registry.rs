//! The proxy's logic slot in a shared slow tree
//!
//! Each proxy owns one slot, derived from its own address so proxies sharing
//! a tree never collide. The slot is written once by `init` and afterwards only
//! through staged proposals, so a logic change is always subject to the tree's
//! delay.

use serde::{Deserialize, Serialize};
use slowgate_core::{Address, CallContext, Field, Result, Slot, SlowGateError, Timepoint};
use slowgate_tree::{verify_read, SlowReadProof, SlowTree, StageReceipt};
use tracing::{debug, info};

/// Label mixed into the slot derivation
pub const LOGIC_SLOT_LABEL: &[u8] = b"slowgate/logic";

/// Registry of the logic address owned by one proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicRegistry {
    owner: Address,
    slot: Option<Slot>,
}

impl LogicRegistry {
    /// Reserved slot of `proxy` in a tree of `depth`
    pub fn slot_for(proxy: &Address, depth: u8) -> Slot {
        Slot::derive(LOGIC_SLOT_LABEL, proxy, depth)
    }

    /// Uninitialized registry owned by `owner`
    pub fn new(owner: Address) -> Self {
        Self { owner, slot: None }
    }

    /// Proxy that owns this registry
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Reserved slot, once initialized
    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    /// True after a successful `init`
    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    fn initialized_slot(&self) -> Result<Slot> {
        self.slot.ok_or_else(|| {
            SlowGateError::not_initialized(format!("logic registry of {} not initialized", self.owner))
        })
    }

    fn logic_address(value: Field, slot: Slot, at: Timepoint) -> Result<Address> {
        if value.is_zero() {
            return Err(SlowGateError::not_initialized(format!(
                "no logic effective in {slot} at {at}"
            )));
        }
        Ok(Address::from_field(value))
    }

    fn ensure_target(logic: &Address) -> Result<()> {
        if logic.is_zero() {
            Err(SlowGateError::invalid("zero address is not a logic contract"))
        } else {
            Ok(())
        }
    }

    /// Stage the first logic address. Returns when it becomes effective.
    ///
    /// `ctx` is the nested call into the tree, so `ctx.caller` is the proxy.
    pub fn init(&mut self, ctx: &CallContext, tree: &mut SlowTree, logic: Address) -> Result<Timepoint> {
        if self.is_initialized() {
            return Err(SlowGateError::already_initialized(format!(
                "logic registry of {} already initialized",
                self.owner
            )));
        }
        Self::ensure_target(&logic)?;

        let slot = Self::slot_for(&self.owner, tree.depth());
        let receipt = tree.stage(ctx, slot, logic.to_field())?;
        self.slot = Some(slot);
        info!(
            proxy = %self.owner,
            %slot,
            %logic,
            effective_at = receipt.effective_at.units(),
            "Logic registry initialized"
        );
        Ok(receipt.effective_at)
    }

    /// Logic address effective at `at`.
    ///
    /// `NotInitialized` if the registry was never initialized or the first
    /// staged address is not effective yet.
    pub fn current_logic(&self, tree: &SlowTree, at: Timepoint) -> Result<Address> {
        let slot = self.initialized_slot()?;
        Self::logic_address(tree.read(slot, at)?, slot, at)
    }

    /// Logic address effective at `at`, checked against `root` through `proof`
    pub fn verified_logic(&self, root: &Field, proof: &SlowReadProof, at: Timepoint) -> Result<Address> {
        let slot = self.initialized_slot()?;
        if proof.slot != slot {
            return Err(SlowGateError::proof_rejected(format!(
                "proof for {} does not cover logic {slot}",
                proof.slot
            )));
        }
        let value = verify_read(root, proof, at)?;
        debug!(proxy = %self.owner, %slot, %value, "Verified logic read");
        Self::logic_address(value, slot, at)
    }

    /// Stage `new` as the next logic address. It takes effect after the
    /// tree's delay like any other write.
    pub fn propose_logic_change(
        &self,
        ctx: &CallContext,
        tree: &mut SlowTree,
        new: Address,
    ) -> Result<StageReceipt> {
        let slot = self.initialized_slot()?;
        Self::ensure_target(&new)?;
        let receipt = tree.stage(ctx, slot, new.to_field())?;
        info!(
            proxy = %self.owner,
            logic = %new,
            effective_at = receipt.effective_at.units(),
            "Logic change proposed"
        );
        Ok(receipt)
    }

    /// Staged logic address not yet effective at `at`, with its effective time
    pub fn pending(&self, tree: &SlowTree, at: Timepoint) -> Result<Option<(Address, Timepoint)>> {
        let slot = self.initialized_slot()?;
        Ok(tree
            .pending(slot, at)?
            .map(|change| (Address::from_field(change.value), change.effective_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use slowgate_core::{SlotScope, SlowTreeConfig, WriterPolicy};

    fn addr(label: &str) -> Address {
        Address::new_from_entropy(label.as_bytes())
    }

    /// Tree administered by "admin" that lets "proxy" write its own slot
    fn setup(delay: u64) -> (SlowTree, LogicRegistry) {
        let mut tree = SlowTree::new(
            addr("tree"),
            &SlowTreeConfig::with_delay(delay).depth(16),
            WriterPolicy::admin_only(addr("admin")),
        )
        .unwrap();
        let slot = LogicRegistry::slot_for(&addr("proxy"), tree.depth());
        let admin = CallContext::new(addr("admin"), Timepoint::ZERO, addr("tree"));
        tree.grant_writer(&admin, addr("proxy"), SlotScope::single(slot))
            .unwrap();
        (tree, LogicRegistry::new(addr("proxy")))
    }

    fn as_proxy(now: u64) -> CallContext {
        CallContext::new(addr("proxy"), Timepoint::new(now), addr("tree"))
    }

    #[test]
    fn test_slot_is_per_proxy() {
        let a = LogicRegistry::slot_for(&addr("proxy-a"), 32);
        let b = LogicRegistry::slot_for(&addr("proxy-b"), 32);
        assert_ne!(a, b);
        assert!(LogicRegistry::slot_for(&addr("proxy-a"), 4).index() < 16);
    }

    #[test]
    fn test_uninitialized_registry() {
        let (tree, registry) = setup(100);
        assert!(!registry.is_initialized());
        assert_matches!(
            registry.current_logic(&tree, Timepoint::new(1_000)),
            Err(SlowGateError::NotInitialized { .. })
        );
        assert_matches!(
            registry.pending(&tree, Timepoint::ZERO),
            Err(SlowGateError::NotInitialized { .. })
        );
    }

    #[test]
    fn test_init_is_delayed_and_once_only() {
        let (mut tree, mut registry) = setup(100);
        let effective = registry.init(&as_proxy(0), &mut tree, addr("logic-a")).unwrap();
        assert_eq!(effective, Timepoint::new(100));

        assert_matches!(
            registry.current_logic(&tree, Timepoint::new(99)),
            Err(SlowGateError::NotInitialized { .. })
        );
        assert_eq!(
            registry.current_logic(&tree, Timepoint::new(100)).unwrap(),
            addr("logic-a")
        );

        assert_matches!(
            registry.init(&as_proxy(200), &mut tree, addr("logic-b")),
            Err(SlowGateError::AlreadyInitialized { .. })
        );
        assert_eq!(
            registry.current_logic(&tree, Timepoint::new(1_000)).unwrap(),
            addr("logic-a")
        );
    }

    #[test]
    fn test_zero_logic_rejected() {
        let (mut tree, mut registry) = setup(100);
        assert_matches!(
            registry.init(&as_proxy(0), &mut tree, Address::ZERO),
            Err(SlowGateError::Invalid { .. })
        );
        assert!(!registry.is_initialized());

        registry.init(&as_proxy(0), &mut tree, addr("logic-a")).unwrap();
        assert_matches!(
            registry.propose_logic_change(&as_proxy(1), &mut tree, Address::ZERO),
            Err(SlowGateError::Invalid { .. })
        );
    }

    #[test]
    fn test_proposal_is_visible_as_pending() {
        let (mut tree, mut registry) = setup(100);
        registry.init(&as_proxy(0), &mut tree, addr("logic-a")).unwrap();
        registry
            .propose_logic_change(&as_proxy(150), &mut tree, addr("logic-b"))
            .unwrap();

        assert_eq!(
            registry.pending(&tree, Timepoint::new(200)).unwrap(),
            Some((addr("logic-b"), Timepoint::new(250)))
        );
        assert_eq!(
            registry.current_logic(&tree, Timepoint::new(200)).unwrap(),
            addr("logic-a")
        );
        assert_eq!(registry.pending(&tree, Timepoint::new(250)).unwrap(), None);
    }

    #[test]
    fn test_unauthorized_writer_cannot_init() {
        let (mut tree, _) = setup(100);
        let mut intruder = LogicRegistry::new(addr("intruder"));
        let ctx = CallContext::new(addr("intruder"), Timepoint::ZERO, addr("tree"));
        assert_matches!(
            intruder.init(&ctx, &mut tree, addr("logic-a")),
            Err(SlowGateError::Unauthorized { .. })
        );
        assert!(!intruder.is_initialized());
    }

    #[test]
    fn test_verified_logic_requires_own_slot() {
        let (mut tree, mut registry) = setup(10);
        registry.init(&as_proxy(0), &mut tree, addr("logic-a")).unwrap();
        let slot = registry.slot().unwrap();

        let proof = tree.prove(slot).unwrap();
        assert_eq!(
            registry
                .verified_logic(&tree.root(), &proof, Timepoint::new(10))
                .unwrap(),
            addr("logic-a")
        );

        let other = Slot((slot.index() + 1) % (1 << 16));
        let wrong = tree.prove(other).unwrap();
        assert_matches!(
            registry.verified_logic(&tree.root(), &wrong, Timepoint::new(10)),
            Err(SlowGateError::ProofRejected { .. })
        );
    }
}
