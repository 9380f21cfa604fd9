//! Message kind tags.

use crate::DecodeError;
use derive_more::Display;

/// The kind tag carried in an [`crate::L1IncomingMessageHeader`].
///
/// The discriminants are the wire values of the envelope's first byte.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[repr(u8)]
pub enum L1MessageKind {
    /// A user-level L2 payload (a contract call or a batch of them).
    #[display("l2_message")]
    L2Message = 3,
    /// A system marker that closes the current block.
    #[display("end_of_block")]
    EndOfBlock = 6,
    /// Chain initialization parameters.
    #[display("initialize")]
    Initialize = 11,
    /// A value deposit from the outer layer.
    #[display("eth_deposit")]
    EthDeposit = 12,
    /// A report on a posted sequencer batch.
    #[display("batch_posting_report")]
    BatchPostingReport = 13,
}

impl TryFrom<u8> for L1MessageKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Self::L2Message),
            6 => Ok(Self::EndOfBlock),
            11 => Ok(Self::Initialize),
            12 => Ok(Self::EthDeposit),
            13 => Ok(Self::BatchPostingReport),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

impl From<L1MessageKind> for u8 {
    fn from(kind: L1MessageKind) -> Self {
        kind as Self
    }
}

/// The kind tag at the front of an L2 payload.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum L2MessageKind {
    /// A contract call carrying gas parameters, destination and value.
    #[display("contract_tx")]
    ContractTx = 1,
    /// A length-prefixed sequence of nested L2 payloads.
    #[display("batch")]
    Batch = 3,
}

impl TryFrom<u8> for L2MessageKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ContractTx),
            3 => Ok(Self::Batch),
            other => Err(DecodeError::UnknownL2Kind(other)),
        }
    }
}
