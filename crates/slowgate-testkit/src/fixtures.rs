//! Ready-made deployments

use crate::sandbox::Sandbox;
use slowgate_core::{Address, Result, SlotScope, SlowTreeConfig, Timepoint};
use slowgate_proxy::{LogicContract, LogicRegistry};

/// Depth used by fixture trees
pub const FIXTURE_DEPTH: u8 = 20;

/// Deterministic identity for a named test actor
pub fn actor(name: &str) -> Address {
    Address::new_from_entropy(format!("actor:{name}").as_bytes())
}

/// A tree, two logic contracts and a proxy, not yet initialized
#[derive(Debug)]
pub struct StackFixture {
    /// Host the stack is deployed on
    pub sandbox: Sandbox,
    /// Administrator of both the tree and the proxy
    pub admin: Address,
    /// Shared slow tree
    pub tree: Address,
    /// Logic adding 1 per call; the proxy's bootstrap logic
    pub logic_a: Address,
    /// Logic adding 10 per call
    pub logic_b: Address,
    /// Proxy routing through `tree`
    pub proxy: Address,
}

impl StackFixture {
    /// Initialize the proxy with its bootstrap logic at the current time
    pub fn init(&self) -> Result<Timepoint> {
        self.sandbox
            .init_slow_tree(self.admin, self.proxy, None)
    }

    /// Deploy one more proxy on the same tree and grant it its logic slot
    pub fn add_proxy(&self) -> Result<Address> {
        deploy_granted_proxy(&self.sandbox, self.admin, self.tree, self.logic_a)
    }
}

fn deploy_granted_proxy(sandbox: &Sandbox, admin: Address, tree: Address, logic: Address) -> Result<Address> {
    let proxy = sandbox.deploy_proxy(admin, tree, logic)?;
    let slot = LogicRegistry::slot_for(&proxy, FIXTURE_DEPTH);
    sandbox.grant_writer(admin, tree, proxy, SlotScope::single(slot))?;
    Ok(proxy)
}

/// Deploy a full stack on a fresh sandbox with the given tree delay.
///
/// The proxy may write only its own logic slot.
pub fn deploy_stack(delay: u64) -> Result<StackFixture> {
    let sandbox = Sandbox::new();
    let admin = actor("admin");
    let tree = sandbox.deploy_slow_tree(admin, &SlowTreeConfig::with_delay(delay).depth(FIXTURE_DEPTH))?;
    let logic_a = sandbox.deploy_logic(LogicContract::new(1))?;
    let logic_b = sandbox.deploy_logic(LogicContract::new(10))?;
    let proxy = deploy_granted_proxy(&sandbox, admin, tree, logic_a)?;

    Ok(StackFixture {
        sandbox,
        admin,
        tree,
        logic_a,
        logic_b,
        proxy,
    })
}
