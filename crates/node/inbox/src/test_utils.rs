//! Message and engine fixtures for unit tests.

use alloy_primitives::{Address, Bytes, U256};
use inbox_executor::{BalanceEngine, ExecutorConfig, GenesisConfig};
use inbox_protocol::{
    ContractTx, EthDeposit, L1IncomingMessage, L1IncomingMessageHeader, L1MessageKind,
    L2Message, MessageWithMetadata,
};
use std::sync::Arc;

pub(crate) const ALICE: Address = Address::new([0xa1; 20]);
pub(crate) const BOB: Address = Address::new([0xb0; 20]);
pub(crate) const GENESIS_BALANCE: u64 = 1_000_000;

fn envelope(kind: L1MessageKind, sender: Address, l2msg: Vec<u8>) -> L1IncomingMessage {
    let header = L1IncomingMessageHeader {
        kind,
        sender,
        block_number: 1,
        timestamp: 1,
        request_id: None,
    };
    L1IncomingMessage::new(header, Bytes::from(l2msg))
}

pub(crate) fn deposit(to: Address, value: U256, delayed: u64) -> MessageWithMetadata {
    let payload = EthDeposit { destination: to, value }.encode();
    MessageWithMetadata::new(envelope(L1MessageKind::EthDeposit, to, payload), false, delayed)
}

pub(crate) fn transfer(from: Address, to: Address, value: u64) -> MessageWithMetadata {
    let tx = ContractTx {
        gas_limit: 21_000,
        destination: to,
        value: U256::from(value),
        ..Default::default()
    };
    let payload = L2Message::ContractTx(tx).encode();
    MessageWithMetadata::new(envelope(L1MessageKind::L2Message, from, payload), false, 0)
}

pub(crate) fn end_of_block() -> MessageWithMetadata {
    MessageWithMetadata::new(envelope(L1MessageKind::EndOfBlock, BOB, Vec::new()), false, 0)
}

pub(crate) fn ending(mut message: MessageWithMetadata) -> MessageWithMetadata {
    message.must_end_block = true;
    message
}

pub(crate) fn engine() -> Arc<BalanceEngine> {
    Arc::new(BalanceEngine::new(
        ExecutorConfig::default(),
        &GenesisConfig::with_account(ALICE, U256::from(GENESIS_BALANCE)),
    ))
}
