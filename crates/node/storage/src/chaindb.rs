//! Typed access to the inbox tables.

use crate::{
    KeyValueStore, StorageError, Table, WriteBatch,
    models::{BLOCK_COUNT_KEY, MESSAGE_COUNT_KEY, u64_key},
};
use alloy_rlp::{Decodable, Encodable};
use inbox_protocol::{MessageWithMetadata, SealedBlock};
use tracing::{error, warn};

/// Inbox tables over a [`KeyValueStore`].
///
/// Reads go straight to the store. Writes are staged into an [`InboxBatch`] and committed
/// with [`InboxDb::commit`] as one atomic batch.
#[derive(Debug)]
pub struct InboxDb<S> {
    store: S,
}

impl<S> InboxDb<S> {
    /// Wraps a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> InboxDb<S> {
    /// Returns the committed ledger length.
    pub fn message_count(&self) -> Result<u64, StorageError> {
        self.counter(MESSAGE_COUNT_KEY, "message_count")
    }

    /// Returns the committed head block number. Zero means only genesis.
    pub fn block_count(&self) -> Result<u64, StorageError> {
        self.counter(BLOCK_COUNT_KEY, "block_count")
    }

    /// Returns the ledger entry at `index`, if stored.
    pub fn message(&self, index: u64) -> Result<Option<MessageWithMetadata>, StorageError> {
        self.decode(Table::Messages, &u64_key(index))
    }

    /// Returns the sealed block numbered `number`, if stored.
    pub fn block(&self, number: u64) -> Result<Option<SealedBlock>, StorageError> {
        self.decode(Table::Blocks, &u64_key(number))
    }

    /// Returns every stored block numbered `number` or higher, in order.
    pub fn blocks_from(&self, number: u64) -> Result<Vec<SealedBlock>, StorageError> {
        self.store
            .entries_from(Table::Blocks, &u64_key(number))?
            .into_iter()
            .map(|(key, raw)| {
                SealedBlock::decode(&mut raw.as_slice()).map_err(|source| {
                    warn!(target: "storage", ?key, %source, "Failed to decode block");
                    StorageError::Decode { table: Table::Blocks, source }
                })
            })
            .collect()
    }

    /// Atomically commits a staged batch.
    pub fn commit(&self, batch: InboxBatch) -> Result<(), StorageError> {
        self.store.write(batch.into_inner()).inspect_err(|err| {
            error!(target: "storage", %err, "Failed to commit inbox batch");
        })
    }

    fn counter(&self, key: &[u8], name: &'static str) -> Result<u64, StorageError> {
        let Some(raw) = self.store.get(Table::Meta, key)? else {
            return Ok(0);
        };
        let bytes: [u8; 8] = raw.as_slice().try_into().map_err(|_| {
            error!(target: "storage", counter = name, len = raw.len(), "Malformed counter");
            StorageError::MalformedCounter(name)
        })?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn decode<T: Decodable>(&self, table: Table, key: &[u8]) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(table, key)? else {
            return Ok(None);
        };
        T::decode(&mut raw.as_slice()).map(Some).map_err(|source| {
            warn!(target: "storage", %table, ?key, %source, "Failed to decode entry");
            StorageError::Decode { table, source }
        })
    }
}

/// Staged writes against the inbox tables.
#[derive(Debug, Clone, Default)]
pub struct InboxBatch {
    batch: WriteBatch,
}

impl InboxBatch {
    /// Stages a ledger entry.
    pub fn put_message(&mut self, index: u64, message: &MessageWithMetadata) {
        self.batch.put(Table::Messages, u64_key(index), encode(message));
    }

    /// Stages removal of every ledger entry at or after `index`.
    pub fn delete_messages_from(&mut self, index: u64) {
        self.batch.delete_from(Table::Messages, u64_key(index));
    }

    /// Stages a sealed block under its number.
    pub fn put_block(&mut self, block: &SealedBlock) {
        self.batch.put(Table::Blocks, u64_key(block.number()), encode(block));
    }

    /// Stages removal of every block numbered `number` or higher.
    pub fn delete_blocks_from(&mut self, number: u64) {
        self.batch.delete_from(Table::Blocks, u64_key(number));
    }

    /// Stages the ledger length.
    pub fn set_message_count(&mut self, count: u64) {
        self.batch.put(Table::Meta, MESSAGE_COUNT_KEY, u64_key(count));
    }

    /// Stages the head block number.
    pub fn set_block_count(&mut self, count: u64) {
        self.batch.put(Table::Meta, BLOCK_COUNT_KEY, u64_key(count));
    }

    /// Returns the raw batch.
    pub fn into_inner(self) -> WriteBatch {
        self.batch
    }
}

fn encode<T: Encodable>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.length());
    value.encode(&mut out);
    out
}
