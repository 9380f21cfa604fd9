//! A bounds-checked cursor over a byte slice.

use crate::DecodeError;
use alloy_primitives::{Address, B256, U256};

#[derive(Debug)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < len {
            return Err(DecodeError::UnexpectedEof { expected: len, remaining: self.buf.len() });
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u64_be(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(word))
    }

    pub(crate) fn b256(&mut self) -> Result<B256, DecodeError> {
        Ok(B256::from_slice(self.take(32)?))
    }

    pub(crate) fn u256(&mut self) -> Result<U256, DecodeError> {
        Ok(U256::from_be_slice(self.take(32)?))
    }

    /// Reads a 32-byte word that must fit into a `u64`.
    pub(crate) fn u64_word(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let word = self.u256()?;
        u64::try_from(word).map_err(|_| DecodeError::Overflow(field))
    }

    /// Reads a raw 20-byte address.
    pub(crate) fn address(&mut self) -> Result<Address, DecodeError> {
        Ok(Address::from_slice(self.take(20)?))
    }

    /// Reads an address left-padded to a 32-byte word.
    pub(crate) fn padded_address(&mut self) -> Result<Address, DecodeError> {
        let word = self.take(32)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(DecodeError::InvalidAddress);
        }
        Ok(Address::from_slice(&word[12..]))
    }

    pub(crate) const fn remaining(&self) -> &'a [u8] {
        self.buf
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
