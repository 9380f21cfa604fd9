//! Errors raised by the reference engine.

use alloy_primitives::{Address, U256};
use inbox_protocol::StateHandle;
use thiserror::Error;

/// An unrecoverable fault in the [`crate::BalanceEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The engine holds no chain state for the handle.
    #[error("unknown chain state {0}")]
    UnknownState(StateHandle),
    /// A block's recorded state does not belong to that block.
    #[error("state {state} does not belong to block {number}")]
    StateMismatch {
        /// The block number.
        number: u64,
        /// The state recorded in the block.
        state: StateHandle,
    },
    /// A transfer exceeds the sender's balance.
    #[error("insufficient balance for {account}: have {balance}, need {required}")]
    InsufficientBalance {
        /// The debited account.
        account: Address,
        /// Its current balance.
        balance: U256,
        /// The amount requested.
        required: U256,
    },
    /// A credit would overflow the recipient's balance.
    #[error("balance overflow for {0}")]
    BalanceOverflow(Address),
    /// A block was requested over an empty message range.
    #[error("cannot seal an empty block at message {0}")]
    EmptyBlock(u64),
}
