//! Outer-layer messages and their ingestion metadata.

use crate::{DecodeError, EthDeposit, L1MessageKind, L2Message, reader::Reader};
use alloc::vec::Vec;
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};

/// The header of an [`L1IncomingMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L1IncomingMessageHeader {
    /// Selects how the payload is interpreted.
    pub kind: L1MessageKind,
    /// The account that originated the message on the outer layer.
    pub sender: Address,
    /// The outer-layer block the message was included in.
    pub block_number: u64,
    /// The outer-layer timestamp of that block.
    pub timestamp: u64,
    /// The outer-layer request identifier, if the message was a tracked request.
    #[cfg_attr(feature = "serde", serde(default))]
    pub request_id: Option<B256>,
}

/// A message from the outer layer, as delivered to the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct L1IncomingMessage {
    /// The message header.
    pub header: L1IncomingMessageHeader,
    /// The kind-specific payload.
    pub l2msg: Bytes,
}

/// A typed view of an [`L1IncomingMessage`] payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    /// An L2 payload.
    L2(L2Message),
    /// A deposit.
    EthDeposit(EthDeposit),
    /// A block-closing marker.
    EndOfBlock,
    /// Chain initialization. The payload is opaque to the inbox.
    Initialize(Bytes),
    /// A batch posting report. The payload is opaque to the inbox.
    BatchPostingReport(Bytes),
}

impl L1IncomingMessage {
    /// The size of the fixed envelope header:
    /// `kind(1) | sender(32) | block_number(32) | timestamp(32) | request_id(32)`.
    pub const HEADER_LEN: usize = 1 + 32 * 4;

    /// Creates a new message.
    pub const fn new(header: L1IncomingMessageHeader, l2msg: Bytes) -> Self {
        Self { header, l2msg }
    }

    /// Returns the message kind.
    pub const fn kind(&self) -> L1MessageKind {
        self.header.kind
    }

    /// Returns the message sender.
    pub const fn sender(&self) -> Address {
        self.header.sender
    }

    /// Encodes the message into its raw envelope form.
    pub fn encode_envelope(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + self.l2msg.len());
        out.push(self.header.kind.into());
        out.extend_from_slice(self.header.sender.into_word().as_slice());
        out.extend_from_slice(&U256::from(self.header.block_number).to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(self.header.timestamp).to_be_bytes::<32>());
        out.extend_from_slice(self.header.request_id.unwrap_or(B256::ZERO).as_slice());
        out.extend_from_slice(&self.l2msg);
        out
    }

    /// Decodes a raw envelope.
    ///
    /// A zero `request_id` word decodes as [`None`].
    pub fn decode_envelope(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let kind = L1MessageKind::try_from(reader.u8()?)?;
        let sender = reader.padded_address()?;
        let block_number = reader.u64_word("block_number")?;
        let timestamp = reader.u64_word("timestamp")?;
        let request_id = Some(reader.b256()?).filter(|id| !id.is_zero());
        let l2msg = Bytes::copy_from_slice(reader.remaining());
        Ok(Self {
            header: L1IncomingMessageHeader { kind, sender, block_number, timestamp, request_id },
            l2msg,
        })
    }

    /// Interprets the payload according to the header kind.
    ///
    /// `max_batch_depth` bounds the nesting of [`L2Message::Batch`] payloads.
    pub fn parse(&self, max_batch_depth: usize) -> Result<ParsedMessage, DecodeError> {
        Ok(match self.header.kind {
            L1MessageKind::L2Message => {
                ParsedMessage::L2(L2Message::decode(&self.l2msg, max_batch_depth)?)
            }
            L1MessageKind::EthDeposit => {
                ParsedMessage::EthDeposit(EthDeposit::decode(&self.l2msg)?)
            }
            L1MessageKind::EndOfBlock => ParsedMessage::EndOfBlock,
            L1MessageKind::Initialize => ParsedMessage::Initialize(self.l2msg.clone()),
            L1MessageKind::BatchPostingReport => {
                ParsedMessage::BatchPostingReport(self.l2msg.clone())
            }
        })
    }
}

/// A message together with the metadata attached when it was accepted into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MessageWithMetadata {
    /// The message.
    pub message: L1IncomingMessage,
    /// Whether the block must be sealed right after this message.
    #[cfg_attr(feature = "serde", serde(default))]
    pub must_end_block: bool,
    /// How many delayed-channel messages have been consumed as of this message.
    #[cfg_attr(feature = "serde", serde(default))]
    pub delayed_messages_read: u64,
}

impl MessageWithMetadata {
    /// Creates a new [`MessageWithMetadata`].
    pub const fn new(
        message: L1IncomingMessage,
        must_end_block: bool,
        delayed_messages_read: u64,
    ) -> Self {
        Self { message, must_end_block, delayed_messages_read }
    }
}

/// Persisted form of [`MessageWithMetadata`]: the raw envelope plus metadata.
///
/// The envelope cannot tell an absent `request_id` from a zero one, so presence is stored
/// next to it.
#[derive(RlpEncodable, RlpDecodable)]
struct StoredMessage {
    envelope: Bytes,
    must_end_block: bool,
    delayed_messages_read: u64,
    has_request_id: bool,
}

impl Encodable for MessageWithMetadata {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        StoredMessage {
            envelope: self.message.encode_envelope().into(),
            must_end_block: self.must_end_block,
            delayed_messages_read: self.delayed_messages_read,
            has_request_id: self.message.header.request_id.is_some(),
        }
        .encode(out)
    }
}

impl Decodable for MessageWithMetadata {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let stored = StoredMessage::decode(buf)?;
        let mut message = L1IncomingMessage::decode_envelope(&stored.envelope)
            .map_err(|_| alloy_rlp::Error::Custom("invalid message envelope"))?;
        let request_id = message.header.request_id.unwrap_or_default();
        message.header.request_id = stored.has_request_id.then_some(request_id);
        Ok(Self {
            message,
            must_end_block: stored.must_end_block,
            delayed_messages_read: stored.delayed_messages_read,
        })
    }
}
