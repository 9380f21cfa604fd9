//! Payloads embedded in outer-layer messages.

use crate::{DecodeError, L2MessageKind, reader::Reader};
use alloc::vec::Vec;
use alloy_primitives::{Address, Bytes, U256};

/// A contract invocation embedded in an [`crate::L1MessageKind::L2Message`].
///
/// Wire layout: `kind(1) | gas_limit(32) | gas_price(32) | destination(20) | value(32) | data`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ContractTx {
    /// The gas limit of the call.
    pub gas_limit: u64,
    /// The gas price offered by the sender.
    pub gas_price: U256,
    /// The account receiving the call.
    pub destination: Address,
    /// The value moved from sender to destination.
    pub value: U256,
    /// Trailing calldata.
    pub data: Bytes,
}

impl ContractTx {
    /// Encodes the transaction, including its leading kind byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 32 + 32 + 20 + 32 + self.data.len());
        out.push(L2MessageKind::ContractTx as u8);
        out.extend_from_slice(&U256::from(self.gas_limit).to_be_bytes::<32>());
        out.extend_from_slice(&self.gas_price.to_be_bytes::<32>());
        out.extend_from_slice(self.destination.as_slice());
        out.extend_from_slice(&self.value.to_be_bytes::<32>());
        out.extend_from_slice(&self.data);
        out
    }

    fn decode_body(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let gas_limit = reader.u64_word("gas_limit")?;
        let gas_price = reader.u256()?;
        let destination = reader.address()?;
        let value = reader.u256()?;
        let data = Bytes::copy_from_slice(reader.remaining());
        Ok(Self { gas_limit, gas_price, destination, value, data })
    }
}

/// A value deposit carried by an [`crate::L1MessageKind::EthDeposit`] message.
///
/// Wire layout: `destination(20) | value(32)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EthDeposit {
    /// The credited account.
    pub destination: Address,
    /// The deposited amount.
    pub value: U256,
}

impl EthDeposit {
    /// Encodes the deposit payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(52);
        out.extend_from_slice(self.destination.as_slice());
        out.extend_from_slice(&self.value.to_be_bytes::<32>());
        out
    }

    /// Decodes a deposit payload.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let destination = reader.address()?;
        let value = reader.u256()?;
        Ok(Self { destination, value })
    }
}

/// A decoded L2 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L2Message {
    /// A single contract call.
    ContractTx(ContractTx),
    /// A sequence of nested payloads, applied in order.
    Batch(Vec<L2Message>),
}

impl L2Message {
    /// Decodes an L2 payload. Batches may nest at most `max_depth` levels.
    pub fn decode(data: &[u8], max_depth: usize) -> Result<Self, DecodeError> {
        Self::decode_at_depth(data, 0, max_depth)
    }

    fn decode_at_depth(data: &[u8], depth: usize, max_depth: usize) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        if reader.is_empty() {
            return Err(DecodeError::Empty);
        }
        match L2MessageKind::try_from(reader.u8()?)? {
            L2MessageKind::ContractTx => {
                Ok(Self::ContractTx(ContractTx::decode_body(&mut reader)?))
            }
            L2MessageKind::Batch => {
                if depth >= max_depth {
                    return Err(DecodeError::BatchTooDeep(max_depth));
                }
                let mut messages = Vec::new();
                while !reader.is_empty() {
                    let len = reader.u64_be()?;
                    let len = usize::try_from(len).map_err(|_| DecodeError::Overflow("batch_len"))?;
                    let inner = reader.take(len)?;
                    messages.push(Self::decode_at_depth(inner, depth + 1, max_depth)?);
                }
                Ok(Self::Batch(messages))
            }
        }
    }

    /// Encodes the payload, including its leading kind byte.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::ContractTx(tx) => tx.encode(),
            Self::Batch(messages) => {
                let mut out = alloc::vec![L2MessageKind::Batch as u8];
                for message in messages {
                    let inner = message.encode();
                    out.extend_from_slice(&(inner.len() as u64).to_be_bytes());
                    out.extend_from_slice(&inner);
                }
                out
            }
        }
    }

    /// Returns the number of contract calls in this payload, counting through batches.
    pub fn tx_count(&self) -> usize {
        match self {
            Self::ContractTx(_) => 1,
            Self::Batch(messages) => messages.iter().map(Self::tx_count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes};

    fn transfer(value: u64) -> ContractTx {
        ContractTx {
            gas_limit: 100_000,
            gas_price: U256::from(1),
            destination: address!("0x00000000000000000000000000000000000000aa"),
            value: U256::from(value),
            data: Bytes::new(),
        }
    }

    #[test]
    fn test_contract_tx_layout() {
        let encoded = transfer(7).encode();
        // kind + gas limit + gas price + destination + value
        assert_eq!(encoded.len(), 1 + 32 + 32 + 20 + 32);
        assert_eq!(encoded[0], L2MessageKind::ContractTx as u8);
        assert_eq!(&encoded[1 + 24..1 + 32], &100_000u64.to_be_bytes());
        assert_eq!(encoded[encoded.len() - 1], 7);
    }

    #[test]
    fn test_contract_tx_keeps_calldata() {
        let mut tx = transfer(1);
        tx.data = bytes!("deadbeef");
        let decoded = L2Message::decode(&tx.encode(), 4).unwrap();
        assert_eq!(decoded, L2Message::ContractTx(tx));
    }

    #[test]
    fn test_contract_tx_truncated() {
        let encoded = transfer(1).encode();
        let err = L2Message::decode(&encoded[..50], 4).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_nested_batch() {
        let inner = L2Message::Batch(alloc::vec![
            L2Message::ContractTx(transfer(1)),
            L2Message::ContractTx(transfer(2)),
        ]);
        let outer = L2Message::Batch(alloc::vec![inner, L2Message::ContractTx(transfer(3))]);
        let decoded = L2Message::decode(&outer.encode(), 4).unwrap();
        assert_eq!(decoded, outer);
        assert_eq!(decoded.tx_count(), 3);
    }

    #[test]
    fn test_batch_depth_limit() {
        let mut message = L2Message::ContractTx(transfer(1));
        for _ in 0..3 {
            message = L2Message::Batch(alloc::vec![message]);
        }
        assert!(L2Message::decode(&message.encode(), 3).is_ok());
        assert_eq!(L2Message::decode(&message.encode(), 2), Err(DecodeError::BatchTooDeep(2)));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(L2Message::decode(&[], 4), Err(DecodeError::Empty));
    }

    #[test]
    fn test_deposit_decode() {
        let deposit = EthDeposit {
            destination: address!("0x00000000000000000000000000000000000000bb"),
            value: U256::from(42),
        };
        assert_eq!(EthDeposit::decode(&deposit.encode()).unwrap(), deposit);
        assert!(EthDeposit::decode(&deposit.encode()[..20]).is_err());
    }
}
