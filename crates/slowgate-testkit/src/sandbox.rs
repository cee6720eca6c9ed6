//! In-memory ledger host
//!
//! The sandbox deploys slow trees, logic contracts and proxies, keeps their
//! state in a [`MemoryStorageHandler`] as DAG-CBOR, and executes every entry
//! point as one transaction:
//!
//! - transactions are totally ordered by a single lock;
//! - state is loaded, transformed, and written back only if the transition
//!   returned `Ok`, so a failed call leaves no trace;
//! - views load state under the same lock and never write it back;
//! - `now` comes from a [`ManualClock`] the test drives.

use crate::clock::ManualClock;
use crate::storage::MemoryStorageHandler;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use slowgate_core::effects::{contract_key, load_state, store_state, StorageEffects};
use slowgate_core::serialization;
use slowgate_core::{
    Address, CallContext, Field, Result, Slot, SlotScope, SlowGateError, SlowTreeConfig,
    Timepoint, WriterPolicy,
};
use slowgate_proxy::{CounterLogic, LogicContract, LogicDispatch, ProxyRouter, SlowUpdateView};
use slowgate_tree::{SlowReadProof, SlowTree, StageReceipt};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Kind of contract deployed at an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    /// A [`SlowTree`]
    SlowTree,
    /// A [`LogicContract`]
    Logic,
    /// A [`ProxyRouter`]
    Proxy,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractKind::SlowTree => "slow tree",
            ContractKind::Logic => "logic contract",
            ContractKind::Proxy => "proxy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct Directory {
    kinds: BTreeMap<Address, ContractKind>,
    deployments: u64,
}

impl Directory {
    fn expect(&self, address: &Address, kind: ContractKind) -> Result<()> {
        match self.kinds.get(address) {
            Some(found) if *found == kind => Ok(()),
            _ => Err(SlowGateError::not_found(format!("no {kind} at {address}"))),
        }
    }

    fn allocate(&mut self, kind: ContractKind) -> Address {
        self.deployments += 1;
        let address = Address::new_from_entropy(format!("{kind}#{}", self.deployments).as_bytes());
        self.kinds.insert(address, kind);
        address
    }
}

/// Runs logic contracts straight out of storage
struct StoredLogic<'a> {
    storage: &'a MemoryStorageHandler,
    directory: &'a Directory,
}

impl LogicDispatch for StoredLogic<'_> {
    fn increment(&self, ctx: &CallContext, logic: &Address, current: u64) -> Result<u64> {
        self.directory.expect(logic, ContractKind::Logic)?;
        let contract: LogicContract = load_state(self.storage, logic)?
            .ok_or_else(|| SlowGateError::not_found(format!("no state for logic contract {logic}")))?;
        contract.increment(ctx, current)
    }
}

/// In-memory ledger host for tests
#[derive(Debug, Default)]
pub struct Sandbox {
    storage: MemoryStorageHandler,
    clock: ManualClock,
    directory: Mutex<Directory>,
}

impl Sandbox {
    /// Empty ledger at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger clock
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Current ledger time
    pub fn now(&self) -> Timepoint {
        self.clock.now()
    }

    /// Advance the ledger clock by `units`
    pub fn advance(&self, units: u64) -> Timepoint {
        self.clock.advance(units)
    }

    /// Jump the ledger clock forward to `at`
    pub fn set_time(&self, at: u64) -> Result<()> {
        self.clock.set(Timepoint::new(at))
    }

    /// Backing storage
    pub fn storage(&self) -> &MemoryStorageHandler {
        &self.storage
    }

    /// Kind of the contract at `address`, if any
    pub fn kind_of(&self, address: &Address) -> Option<ContractKind> {
        self.directory.lock().kinds.get(address).copied()
    }

    fn load<T>(&self, directory: &Directory, address: &Address, kind: ContractKind) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        directory.expect(address, kind)?;
        load_state(&self.storage, address)?
            .ok_or_else(|| SlowGateError::internal(format!("{kind} at {address} has no state")))
    }

    fn deploy<T: Serialize>(&self, kind: ContractKind, state: impl FnOnce(Address) -> Result<T>) -> Result<Address> {
        let mut directory = self.directory.lock();
        let address = directory.allocate(kind);
        let stored = state(address).and_then(|s| store_state(&self.storage, &address, &s));
        if let Err(err) = stored {
            directory.kinds.remove(&address);
            return Err(err);
        }
        debug!(%address, %kind, "Contract deployed");
        Ok(address)
    }

    /// Deploy a slow tree administered by `admin`
    pub fn deploy_slow_tree(&self, admin: Address, config: &SlowTreeConfig) -> Result<Address> {
        self.deploy(ContractKind::SlowTree, |address| {
            SlowTree::new(address, config, WriterPolicy::admin_only(admin))
        })
    }

    /// Deploy a logic contract
    pub fn deploy_logic(&self, logic: LogicContract) -> Result<Address> {
        self.deploy(ContractKind::Logic, |_| Ok(logic))
    }

    /// Deploy a proxy routing through `tree`, naming `logic` as its bootstrap logic
    pub fn deploy_proxy(&self, admin: Address, tree: Address, logic: Address) -> Result<Address> {
        {
            let directory = self.directory.lock();
            directory.expect(&tree, ContractKind::SlowTree)?;
        }
        self.deploy(ContractKind::Proxy, |address| {
            ProxyRouter::new(address, admin, tree, logic)
        })
    }

    fn context(&self, caller: Address, this: Address) -> CallContext {
        CallContext::new(caller, self.clock.now(), this)
    }

    /// Write pre-encoded states. If a write fails, the ones before it are
    /// restored to their previous bytes.
    fn commit(&self, writes: Vec<(String, Vec<u8>)>) -> Result<()> {
        let mut written: Vec<(String, Option<Vec<u8>>)> = Vec::with_capacity(writes.len());
        for (key, bytes) in writes {
            let prior = self.storage.retrieve(&key)?;
            if let Err(err) = self.storage.store(&key, bytes) {
                for (key, prior) in written.into_iter().rev() {
                    let restored = match prior {
                        Some(bytes) => self.storage.store(&key, bytes),
                        None => self.storage.remove(&key).map(|_| ()),
                    };
                    if let Err(undo) = restored {
                        warn!(%key, error = %undo, "Failed to restore state after aborted commit");
                    }
                }
                return Err(err.into());
            }
            written.push((key, prior));
        }
        Ok(())
    }

    fn load_proxy(&self, directory: &Directory, proxy: &Address) -> Result<(ProxyRouter, SlowTree)> {
        let router: ProxyRouter = self.load(directory, proxy, ContractKind::Proxy)?;
        let tree: SlowTree = self.load(directory, &router.tree(), ContractKind::SlowTree)?;
        Ok((router, tree))
    }

    /// Run one transaction against the tree at `tree`
    pub fn with_tree<R>(
        &self,
        caller: Address,
        tree: Address,
        f: impl FnOnce(&CallContext, &mut SlowTree) -> Result<R>,
    ) -> Result<R> {
        let directory = self.directory.lock();
        let mut state: SlowTree = self.load(&directory, &tree, ContractKind::SlowTree)?;
        let ctx = self.context(caller, tree);
        let out = f(&ctx, &mut state)?;
        store_state(&self.storage, &tree, &state)?;
        Ok(out)
    }

    /// Run one transaction against the proxy at `proxy` and the tree it
    /// routes through
    pub fn with_proxy<R>(
        &self,
        caller: Address,
        proxy: Address,
        f: impl FnOnce(&CallContext, &mut ProxyRouter, &mut SlowTree, &dyn LogicDispatch) -> Result<R>,
    ) -> Result<R> {
        let directory = self.directory.lock();
        let (mut router, mut tree) = self.load_proxy(&directory, &proxy)?;
        let tree_address = router.tree();
        let dispatch = StoredLogic {
            storage: &self.storage,
            directory: &directory,
        };

        let ctx = self.context(caller, proxy);
        let out = f(&ctx, &mut router, &mut tree, &dispatch)?;

        let writes = vec![
            (contract_key(&tree_address), serialization::to_vec(&tree)?),
            (contract_key(&proxy), serialization::to_vec(&router)?),
        ];
        self.commit(writes)?;
        Ok(out)
    }

    /// Read the tree at `tree` without writing anything back
    pub fn view_tree<R>(&self, tree: Address, f: impl FnOnce(&SlowTree) -> Result<R>) -> Result<R> {
        let directory = self.directory.lock();
        let state: SlowTree = self.load(&directory, &tree, ContractKind::SlowTree)?;
        f(&state)
    }

    /// Read the proxy at `proxy` and its tree at the current ledger time
    /// without writing anything back
    pub fn view_proxy<R>(
        &self,
        proxy: Address,
        f: impl FnOnce(Timepoint, &ProxyRouter, &SlowTree) -> Result<R>,
    ) -> Result<R> {
        let directory = self.directory.lock();
        let (router, tree) = self.load_proxy(&directory, &proxy)?;
        f(self.clock.now(), &router, &tree)
    }

    /// Tree admin grants `writer` access to `scope`
    pub fn grant_writer(&self, caller: Address, tree: Address, writer: Address, scope: SlotScope) -> Result<()> {
        self.with_tree(caller, tree, |ctx, t| t.grant_writer(ctx, writer, scope))
    }

    /// Stage `value` in `slot` of `tree`
    pub fn stage(&self, caller: Address, tree: Address, slot: Slot, value: Field) -> Result<StageReceipt> {
        self.with_tree(caller, tree, |ctx, t| t.stage(ctx, slot, value))
    }

    /// Read `slot` of `tree` at the current ledger time
    pub fn read(&self, tree: Address, slot: Slot) -> Result<Field> {
        let now = self.clock.now();
        self.view_tree(tree, |t| t.read(slot, now))
    }

    /// Current root of `tree`
    pub fn tree_root(&self, tree: Address) -> Result<Field> {
        self.view_tree(tree, |t| Ok(t.root()))
    }

    /// Membership proof for `slot` of `tree` in its current state
    pub fn prove(&self, tree: Address, slot: Slot) -> Result<SlowReadProof> {
        self.view_tree(tree, |t| t.prove(slot))
    }

    /// `init_slow_tree` on `proxy`; `None` stages the proxy's bootstrap logic
    pub fn init_slow_tree(&self, caller: Address, proxy: Address, logic: Option<Address>) -> Result<Timepoint> {
        self.with_proxy(caller, proxy, |ctx, router, tree, _| {
            router.init_slow_tree(ctx, tree, logic)
        })
    }

    /// `propose_logic_change` on `proxy`
    pub fn propose_logic_change(&self, caller: Address, proxy: Address, new: Address) -> Result<StageReceipt> {
        self.with_proxy(caller, proxy, |ctx, router, tree, _| {
            router.propose_logic_change(ctx, tree, new)
        })
    }

    /// Private-path `call_counter` on `proxy`
    pub fn call_counter(&self, caller: Address, proxy: Address) -> Result<u64> {
        self.with_proxy(caller, proxy, |ctx, router, tree, dispatch| {
            router.call_counter(ctx, tree, dispatch)
        })
    }

    /// `call_counter` on `proxy` with a caller-supplied proof, checked against
    /// the root the ledger holds for the proxy's tree
    pub fn call_counter_with_proof(&self, caller: Address, proxy: Address, proof: &SlowReadProof) -> Result<u64> {
        self.with_proxy(caller, proxy, |ctx, router, tree, dispatch| {
            router.call_counter_with_proof(ctx, &tree.root(), proof, dispatch)
        })
    }

    /// Public-path `call_public_counter` on `proxy`
    pub fn call_public_counter(&self, caller: Address, proxy: Address) -> Result<u64> {
        self.with_proxy(caller, proxy, |ctx, router, tree, dispatch| {
            router.call_public_counter(ctx, tree, dispatch)
        })
    }

    /// Counter stored by `proxy`
    pub fn get_count(&self, proxy: Address) -> Result<u64> {
        self.view_proxy(proxy, |_, router, _| Ok(router.get_count()))
    }

    /// Logic state of `proxy` at the current ledger time
    pub fn get_slow_update(&self, proxy: Address) -> Result<SlowUpdateView> {
        self.view_proxy(proxy, |now, router, tree| router.get_slow_update(tree, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn addr(label: &str) -> Address {
        Address::new_from_entropy(label.as_bytes())
    }

    #[test]
    fn test_deploy_assigns_distinct_addresses() {
        let sandbox = Sandbox::new();
        let a = sandbox.deploy_logic(LogicContract::new(1)).unwrap();
        let b = sandbox.deploy_logic(LogicContract::new(1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(sandbox.kind_of(&a), Some(ContractKind::Logic));
    }

    #[test]
    fn test_failed_deploy_leaves_no_contract() {
        let sandbox = Sandbox::new();
        let result = sandbox.deploy_slow_tree(addr("admin"), &SlowTreeConfig::with_delay(0));
        assert_matches!(result, Err(SlowGateError::Invalid { .. }));
        assert!(sandbox.storage().is_empty());
    }

    #[test]
    fn test_wrong_kind_is_not_found() {
        let sandbox = Sandbox::new();
        let logic = sandbox.deploy_logic(LogicContract::new(1)).unwrap();
        assert_matches!(
            sandbox.read(logic, Slot(0)),
            Err(SlowGateError::NotFound { .. })
        );
        assert_matches!(
            sandbox.deploy_proxy(addr("admin"), logic, logic),
            Err(SlowGateError::NotFound { .. })
        );
    }

    #[test]
    fn test_failed_transaction_is_discarded() {
        let sandbox = Sandbox::new();
        let tree = sandbox
            .deploy_slow_tree(addr("admin"), &SlowTreeConfig::with_delay(10).depth(8))
            .unwrap();
        let root = sandbox.tree_root(tree).unwrap();

        let result: Result<()> = sandbox.with_tree(addr("admin"), tree, |ctx, t| {
            t.stage(ctx, Slot(1), Field::from_u64(1))?;
            Err(SlowGateError::internal("abort after stage"))
        });
        assert!(result.is_err());
        assert_eq!(sandbox.tree_root(tree).unwrap(), root);
    }

    #[test]
    fn test_stage_and_read_follow_clock() {
        let sandbox = Sandbox::new();
        let tree = sandbox
            .deploy_slow_tree(addr("admin"), &SlowTreeConfig::with_delay(10).depth(8))
            .unwrap();
        sandbox
            .stage(addr("admin"), tree, Slot(4), Field::from_u64(9))
            .unwrap();

        sandbox.advance(9);
        assert_eq!(sandbox.read(tree, Slot(4)).unwrap(), Field::ZERO);
        sandbox.advance(1);
        assert_eq!(sandbox.read(tree, Slot(4)).unwrap(), Field::from_u64(9));
    }

    #[test]
    fn test_views_do_not_write() {
        let sandbox = Sandbox::new();
        let admin = addr("admin");
        let tree = sandbox
            .deploy_slow_tree(admin, &SlowTreeConfig::with_delay(10).depth(8))
            .unwrap();
        let logic = sandbox.deploy_logic(LogicContract::new(1)).unwrap();
        let proxy = sandbox.deploy_proxy(admin, tree, logic).unwrap();
        sandbox.grant_writer(admin, tree, proxy, SlotScope::All).unwrap();
        sandbox.init_slow_tree(admin, proxy, None).unwrap();
        sandbox.advance(10);

        let before = sandbox.storage().snapshot();
        sandbox.read(tree, Slot(3)).unwrap();
        sandbox.tree_root(tree).unwrap();
        sandbox.prove(tree, Slot(3)).unwrap();
        assert_eq!(sandbox.get_count(proxy).unwrap(), 0);
        assert_eq!(sandbox.get_slow_update(proxy).unwrap().current, Some(logic));
        assert_eq!(sandbox.storage().snapshot(), before);
    }

    #[test]
    fn test_proxy_commit_writes_both_states() {
        let sandbox = Sandbox::new();
        let admin = addr("admin");
        let tree = sandbox
            .deploy_slow_tree(admin, &SlowTreeConfig::with_delay(10).depth(8))
            .unwrap();
        let logic = sandbox.deploy_logic(LogicContract::new(1)).unwrap();
        let proxy = sandbox.deploy_proxy(admin, tree, logic).unwrap();
        sandbox.grant_writer(admin, tree, proxy, SlotScope::All).unwrap();
        let root = sandbox.tree_root(tree).unwrap();

        sandbox.init_slow_tree(admin, proxy, None).unwrap();
        assert_ne!(sandbox.tree_root(tree).unwrap(), root);
        assert_eq!(
            sandbox.get_slow_update(proxy).unwrap().pending,
            Some((logic, Timepoint::new(10)))
        );
    }
}
