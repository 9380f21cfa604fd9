//! Shared fixtures for the inbox integration tests.
#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, U256};
use inbox_executor::{BalanceEngine, ExecutorConfig, GenesisConfig};
use inbox_protocol::{
    ContractTx, EthDeposit, L1IncomingMessage, L1IncomingMessageHeader, L1MessageKind,
    L2Message, MessageWithMetadata, SealedBlock,
};
use inbox_state::InboxState;
use inbox_storage::{KeyValueStore, MemoryDb};
use std::sync::Arc;

pub type Inbox<S = MemoryDb> = InboxState<S, Arc<BalanceEngine>>;

pub const OWNER: Address = Address::new([0x0e; 20]);
pub const OWNER_BALANCE: u64 = 1_000_000_000_000_000_000;

/// Installs a test subscriber once. Output is captured by the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine() -> Arc<BalanceEngine> {
    engine_with(ExecutorConfig::default())
}

pub fn engine_with(config: ExecutorConfig) -> Arc<BalanceEngine> {
    let genesis = GenesisConfig::with_account(OWNER, U256::from(OWNER_BALANCE));
    Arc::new(BalanceEngine::new(config, &genesis))
}

pub fn inbox() -> Inbox {
    open(MemoryDb::new(), engine())
}

pub fn open<S: KeyValueStore>(store: S, engine: Arc<BalanceEngine>) -> Inbox<S> {
    init_tracing();
    InboxState::open(store, engine).unwrap()
}

/// Returns an account address derived from `n`.
pub fn account(n: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    Address::from(bytes)
}

fn envelope(kind: L1MessageKind, sender: Address, l2msg: Vec<u8>) -> L1IncomingMessage {
    let header = L1IncomingMessageHeader {
        kind,
        sender,
        block_number: 0,
        timestamp: 0,
        request_id: None,
    };
    L1IncomingMessage::new(header, Bytes::from(l2msg))
}

/// A value transfer from `from` to `to`.
pub fn transfer(from: Address, to: Address, value: u64) -> MessageWithMetadata {
    let tx = ContractTx {
        gas_limit: 100_000,
        gas_price: U256::ONE,
        destination: to,
        value: U256::from(value),
        data: Bytes::new(),
    };
    MessageWithMetadata::new(
        envelope(L1MessageKind::L2Message, from, L2Message::ContractTx(tx).encode()),
        false,
        0,
    )
}

/// A deposit crediting `to`.
pub fn deposit(to: Address, value: u64) -> MessageWithMetadata {
    let payload = EthDeposit { destination: to, value: U256::from(value) }.encode();
    MessageWithMetadata::new(envelope(L1MessageKind::EthDeposit, to, payload), false, 0)
}

/// Marks `message` as closing its block.
pub fn ending(mut message: MessageWithMetadata) -> MessageWithMetadata {
    message.must_end_block = true;
    message
}

/// Returns every committed block from genesis to the head.
pub fn blocks<S: KeyValueStore>(inbox: &Inbox<S>) -> Vec<SealedBlock> {
    let head = inbox.head().head_block.number();
    (0..=head).map(|n| inbox.block_by_number(n).unwrap().unwrap()).collect()
}

/// Returns the balance of `account` after the last ledger entry.
pub fn balance<S: KeyValueStore>(inbox: &Inbox<S>, account: Address) -> U256 {
    inbox.engine().balance(inbox.head().state, account).unwrap()
}
