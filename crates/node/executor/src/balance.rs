//! A reference [`ExecutionEngine`] that tracks account balances.

use crate::{
    ApplyOutcome, BlockBoundary, ExecutionEngine, ExecutorConfig, ExecutorError, GenesisConfig,
};
use alloy_primitives::{Address, B256, U256, keccak256};
use inbox_protocol::{
    BlockHeader, BlockRef, L2Message, MessageWithMetadata, ParsedMessage, SealedBlock, StateHandle,
};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    mem,
    ops::Range,
    sync::Arc,
};
use tracing::{debug, trace, warn};

/// Accumulated effects of the messages applied since the last sealed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingBlock {
    gas_used: u64,
    timestamp: u64,
}

/// One immutable chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChainSnapshot {
    balances: BTreeMap<Address, U256>,
    head: BlockRef,
    pending: PendingBlock,
}

impl ChainSnapshot {
    fn state_root(&self) -> B256 {
        let mut buf = Vec::with_capacity(self.balances.len() * 52);
        for (account, balance) in &self.balances {
            buf.extend_from_slice(account.as_slice());
            buf.extend_from_slice(&balance.to_be_bytes::<32>());
        }
        keccak256(buf)
    }

    fn handle(&self) -> StateHandle {
        let mut buf = Vec::with_capacity(32 * 3 + 24);
        buf.extend_from_slice(self.state_root().as_slice());
        buf.extend_from_slice(&self.head.number.to_be_bytes());
        buf.extend_from_slice(self.head.hash.as_slice());
        buf.extend_from_slice(&self.pending.gas_used.to_be_bytes());
        buf.extend_from_slice(&self.pending.timestamp.to_be_bytes());
        StateHandle(keccak256(buf))
    }

    fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn credit(&mut self, account: Address, value: U256) -> Result<(), ExecutorError> {
        if value.is_zero() {
            return Ok(());
        }
        let balance = self
            .balance(&account)
            .checked_add(value)
            .ok_or(ExecutorError::BalanceOverflow(account))?;
        self.balances.insert(account, balance);
        Ok(())
    }

    fn debit(&mut self, account: Address, value: U256) -> Result<(), ExecutorError> {
        let balance = self.balance(&account);
        let remaining = balance.checked_sub(value).ok_or(ExecutorError::InsufficientBalance {
            account,
            balance,
            required: value,
        })?;
        if remaining.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, remaining);
        }
        Ok(())
    }

    fn apply_l2(&mut self, sender: Address, message: &L2Message) -> Result<(), ExecutorError> {
        match message {
            L2Message::ContractTx(tx) => {
                self.debit(sender, tx.value)?;
                self.credit(tx.destination, tx.value)?;
                self.pending.gas_used = self.pending.gas_used.saturating_add(tx.gas_limit);
                Ok(())
            }
            L2Message::Batch(messages) => {
                messages.iter().try_for_each(|message| self.apply_l2(sender, message))
            }
        }
    }
}

/// A sealed block as the engine tracks it for pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SealedRef {
    number: u64,
    hash: B256,
    parent_hash: B256,
    state: StateHandle,
}

impl From<&SealedBlock> for SealedRef {
    fn from(block: &SealedBlock) -> Self {
        Self {
            number: block.number(),
            hash: block.hash,
            parent_hash: block.header.parent_hash,
            state: block.state,
        }
    }
}

/// The chain states held by a [`BalanceEngine`].
///
/// Between prunes every new state is recorded in `fresh` and every new block in `sealed`.
/// A prune keeps the states of the committed chain plus the open state and drops the rest.
#[derive(Debug)]
struct StateIndex {
    snapshots: HashMap<StateHandle, Arc<ChainSnapshot>>,
    /// The committed chain as of the last prune, by block number.
    canonical: BTreeMap<u64, SealedRef>,
    /// Blocks sealed since the last prune, by hash.
    sealed: HashMap<B256, SealedRef>,
    fresh: Vec<StateHandle>,
    open: StateHandle,
}

impl StateIndex {
    fn new(genesis: &SealedBlock, snapshot: ChainSnapshot) -> Self {
        Self {
            snapshots: HashMap::from([(genesis.state, Arc::new(snapshot))]),
            canonical: BTreeMap::from([(0, SealedRef::from(genesis))]),
            sealed: HashMap::new(),
            fresh: Vec::new(),
            open: genesis.state,
        }
    }

    fn insert(&mut self, snapshot: ChainSnapshot) -> StateHandle {
        let handle = snapshot.handle();
        if let Entry::Vacant(entry) = self.snapshots.entry(handle) {
            entry.insert(Arc::new(snapshot));
            self.fresh.push(handle);
        }
        handle
    }

    fn is_canonical(&self, block: &SealedRef) -> bool {
        self.canonical.get(&block.number).is_some_and(|known| known.hash == block.hash)
    }

    fn parent(&self, block: &SealedRef) -> Option<SealedRef> {
        let number = block.number.checked_sub(1)?;
        match self.canonical.get(&number) {
            Some(parent) if parent.hash == block.parent_hash => Some(*parent),
            _ => self.sealed.get(&block.parent_hash).copied(),
        }
    }

    /// A state is live if it is the open state or the post-seal state of a committed block.
    fn is_live(&self, state: &StateHandle) -> bool {
        *state == self.open ||
            self.snapshots.get(state).is_some_and(|snapshot| {
                self.canonical
                    .get(&snapshot.head.number)
                    .is_some_and(|block| block.state == *state)
            })
    }

    /// Re-roots the committed chain at `head` and drops unreachable states.
    ///
    /// Returns the number of released states, or [`None`] if `head` does not descend from a
    /// known block, in which case nothing is released.
    fn prune(&mut self, head: &SealedBlock, open: StateHandle) -> Option<usize> {
        let mut branch = Vec::new();
        let mut cursor = SealedRef::from(head);
        while !self.is_canonical(&cursor) {
            let parent = self.parent(&cursor)?;
            branch.push(cursor);
            cursor = parent;
        }

        let mut stale = self
            .canonical
            .split_off(&(cursor.number + 1))
            .into_values()
            .map(|block| block.state)
            .collect::<Vec<_>>();
        self.canonical.extend(branch.into_iter().map(|block| (block.number, block)));
        stale.append(&mut self.fresh);
        stale.push(mem::replace(&mut self.open, open));
        self.sealed.clear();

        let held = self.snapshots.len();
        for state in stale {
            if !self.is_live(&state) {
                self.snapshots.remove(&state);
            }
        }
        Some(held - self.snapshots.len())
    }
}

/// An in-memory engine whose chain state is a map of account balances.
///
/// States are keyed by their content-addressed [`StateHandle`]. The post-seal state of every
/// committed block is kept, so any of them can be rewound to without replay. States of
/// discarded forks, failed batches and superseded open blocks are released on
/// [`ExecutionEngine::prune`].
#[derive(Debug)]
pub struct BalanceEngine {
    config: ExecutorConfig,
    genesis: SealedBlock,
    index: RwLock<StateIndex>,
}

impl BalanceEngine {
    /// Creates an engine starting from `genesis`.
    pub fn new(config: ExecutorConfig, genesis: &GenesisConfig) -> Self {
        let mut snapshot = ChainSnapshot {
            balances: genesis
                .alloc
                .iter()
                .filter(|(_, balance)| !balance.is_zero())
                .map(|(account, balance)| (*account, *balance))
                .collect(),
            head: BlockRef::default(),
            pending: PendingBlock { gas_used: 0, timestamp: genesis.timestamp },
        };
        let header = BlockHeader {
            number: 0,
            parent_hash: B256::ZERO,
            state_root: snapshot.state_root(),
            message_start: 0,
            message_end: 0,
            timestamp: genesis.timestamp,
            gas_used: 0,
        };
        snapshot.head = BlockRef { number: 0, hash: header.hash_slow() };
        let state = snapshot.handle();
        let genesis = SealedBlock::new(header, state);

        debug!(
            target: "executor",
            hash = %genesis.hash,
            accounts = snapshot.balances.len(),
            "Initialized genesis"
        );
        let index = RwLock::new(StateIndex::new(&genesis, snapshot));
        Self { config, genesis, index }
    }

    /// Returns the engine configuration.
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the balance of `account` in `state`.
    pub fn balance(&self, state: StateHandle, account: Address) -> Result<U256, ExecutorError> {
        Ok(self.snapshot(state)?.balance(&account))
    }

    /// Returns all non-zero balances in `state`.
    pub fn balances(&self, state: StateHandle) -> Result<BTreeMap<Address, U256>, ExecutorError> {
        Ok(self.snapshot(state)?.balances.clone())
    }

    /// Returns the number of chain states held.
    pub fn state_count(&self) -> usize {
        self.index.read().snapshots.len()
    }

    fn snapshot(&self, state: StateHandle) -> Result<Arc<ChainSnapshot>, ExecutorError> {
        self.index
            .read()
            .snapshots
            .get(&state)
            .cloned()
            .ok_or(ExecutorError::UnknownState(state))
    }
}

impl ExecutionEngine for BalanceEngine {
    type Error = ExecutorError;

    fn genesis(&self) -> SealedBlock {
        self.genesis
    }

    fn apply_message(
        &self,
        state: StateHandle,
        message: &MessageWithMetadata,
    ) -> Result<ApplyOutcome, Self::Error> {
        let mut snapshot = ChainSnapshot::clone(&*self.snapshot(state)?);
        let header = &message.message.header;
        snapshot.pending.timestamp = snapshot.pending.timestamp.max(header.timestamp);

        let mut boundary = BlockBoundary::Continue;
        match message.message.parse(self.config.max_batch_depth) {
            Ok(ParsedMessage::L2(l2)) => snapshot.apply_l2(header.sender, &l2)?,
            Ok(ParsedMessage::EthDeposit(deposit)) => {
                snapshot.credit(deposit.destination, deposit.value)?
            }
            Ok(ParsedMessage::EndOfBlock) => boundary = BlockBoundary::End,
            Ok(ParsedMessage::Initialize(_) | ParsedMessage::BatchPostingReport(_)) => {}
            Err(err) => {
                warn!(
                    target: "executor",
                    kind = %header.kind,
                    sender = %header.sender,
                    %err,
                    "Skipping malformed message payload"
                );
            }
        }

        if snapshot.pending.gas_used >= self.config.block_gas_limit {
            let gas_used = snapshot.pending.gas_used;
            trace!(target: "executor", gas_used, "Block gas limit reached");
            boundary = BlockBoundary::End;
        }

        Ok(ApplyOutcome { state: self.index.write().insert(snapshot), boundary })
    }

    fn seal_block(
        &self,
        state: StateHandle,
        messages: Range<u64>,
    ) -> Result<SealedBlock, Self::Error> {
        if messages.is_empty() {
            return Err(ExecutorError::EmptyBlock(messages.start));
        }
        let snapshot = self.snapshot(state)?;
        let header = BlockHeader {
            number: snapshot.head.number + 1,
            parent_hash: snapshot.head.hash,
            state_root: snapshot.state_root(),
            message_start: messages.start,
            message_end: messages.end,
            timestamp: snapshot.pending.timestamp,
            gas_used: snapshot.pending.gas_used,
        };
        let hash = header.hash_slow();

        let mut next = ChainSnapshot::clone(&snapshot);
        next.head = BlockRef { number: header.number, hash };
        next.pending = PendingBlock { gas_used: 0, timestamp: header.timestamp };
        let block = {
            let mut index = self.index.write();
            let block = SealedBlock { header, hash, state: index.insert(next) };
            index.sealed.insert(hash, SealedRef::from(&block));
            block
        };

        trace!(target: "executor", number = block.number(), %hash, "Sealed block");
        Ok(block)
    }

    fn rewind_to(&self, block: Option<&SealedBlock>) -> Result<StateHandle, Self::Error> {
        let Some(block) = block else {
            return Ok(self.genesis.state);
        };
        let snapshot = self.snapshot(block.state)?;
        if snapshot.head.hash != block.hash {
            return Err(ExecutorError::StateMismatch { number: block.number(), state: block.state });
        }
        Ok(block.state)
    }

    fn prune(&self, head: &SealedBlock, open: StateHandle) {
        let mut index = self.index.write();
        match index.prune(head, open) {
            Some(released) => trace!(
                target: "executor",
                head = head.number(),
                released,
                held = index.snapshots.len(),
                "Pruned chain states"
            ),
            None => warn!(
                target: "executor",
                number = head.number(),
                hash = %head.hash,
                "Head does not descend from a known block, keeping all states"
            ),
        }
    }
}
