//! Sealed block records.

use alloy_primitives::{B256, keccak256};
use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use core::ops::Range;
use derive_more::{Deref, Display, From};

/// An opaque identifier for a chain state owned by the execution engine.
///
/// The inbox never looks inside a chain state. It only threads these handles between
/// engine calls and records the post-seal handle of every [`SealedBlock`].
#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    From,
    Deref,
    RlpEncodableWrapper,
    RlpDecodableWrapper,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateHandle(pub B256);

/// A block number and hash pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockRef {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
}

/// The hashed portion of a [`SealedBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BlockHeader {
    /// The block number. Genesis is block 0.
    pub number: u64,
    /// The hash of the parent block.
    pub parent_hash: B256,
    /// A commitment to the chain state after this block.
    pub state_root: B256,
    /// The first message index folded into this block.
    pub message_start: u64,
    /// One past the last message index folded into this block.
    pub message_end: u64,
    /// The outer-layer timestamp of the block.
    pub timestamp: u64,
    /// Gas consumed by the block's messages.
    pub gas_used: u64,
}

impl BlockHeader {
    /// Hashes the RLP encoding of the header.
    pub fn hash_slow(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// A finalized block produced by folding the messages in `[message_start, message_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SealedBlock {
    /// The block header.
    pub header: BlockHeader,
    /// The header hash.
    pub hash: B256,
    /// The engine's chain state right after this block was sealed.
    pub state: StateHandle,
}

impl SealedBlock {
    /// Seals a header, computing its hash.
    pub fn new(header: BlockHeader, state: StateHandle) -> Self {
        Self { hash: header.hash_slow(), header, state }
    }

    /// Returns the block number.
    pub const fn number(&self) -> u64 {
        self.header.number
    }

    /// Returns the [`BlockRef`] of this block.
    pub const fn id(&self) -> BlockRef {
        BlockRef { number: self.header.number, hash: self.hash }
    }

    /// Returns the half-open message range this block was built from.
    pub const fn message_range(&self) -> Range<u64> {
        self.header.message_start..self.header.message_end
    }

    /// Returns whether the message at `index` was folded into this block.
    pub const fn contains_message(&self, index: u64) -> bool {
        self.header.message_start <= index && index < self.header.message_end
    }

    /// Returns whether the stored hash matches the header.
    pub fn is_valid_seal(&self) -> bool {
        self.hash == self.header.hash_slow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_rlp::Decodable;

    fn block(start: u64, end: u64) -> SealedBlock {
        SealedBlock::new(
            BlockHeader { number: 1, message_start: start, message_end: end, ..Default::default() },
            StateHandle(B256::repeat_byte(0x11)),
        )
    }

    #[test]
    fn test_contains_message() {
        let block = block(3, 5);
        assert!(!block.contains_message(2));
        assert!(block.contains_message(3));
        assert!(block.contains_message(4));
        assert!(!block.contains_message(5));
        assert_eq!(block.message_range(), 3..5);
    }

    #[test]
    fn test_hash_commits_to_range() {
        assert_ne!(block(0, 3).hash, block(0, 4).hash);
        assert_eq!(block(0, 3).hash, block(0, 3).hash);
    }

    #[test]
    fn test_rlp_preserves_seal() {
        let block = block(0, 3);
        let encoded = alloy_rlp::encode(block);
        let decoded = SealedBlock::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.is_valid_seal());
    }
}
