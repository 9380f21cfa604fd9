//! Table layout used by the inbox.
//!
//! - [`Table::Messages`]: **key** message index (`u64`, big-endian), **value** RLP
//!   [`MessageWithMetadata`](inbox_protocol::MessageWithMetadata).
//! - [`Table::Blocks`]: **key** block number (`u64`, big-endian), **value** RLP
//!   [`SealedBlock`](inbox_protocol::SealedBlock). Block 0 is genesis.
//! - [`Table::Meta`]: named `u64` counters.
//!
//! Big-endian keys keep lexicographic order equal to numeric order, which range deletion
//! relies on.

use derive_more::Display;

/// A storage table.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    /// Ledger entries by message index.
    #[display("messages")]
    Messages,
    /// Sealed blocks by block number.
    #[display("blocks")]
    Blocks,
    /// Named counters.
    #[display("meta")]
    Meta,
}

/// Key of the committed ledger length in [`Table::Meta`].
pub(crate) const MESSAGE_COUNT_KEY: &[u8] = b"message_count";

/// Key of the committed head block number in [`Table::Meta`].
pub(crate) const BLOCK_COUNT_KEY: &[u8] = b"block_count";

/// Encodes a numeric key.
pub(crate) const fn u64_key(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}
