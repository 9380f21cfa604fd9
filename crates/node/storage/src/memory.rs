//! An in-memory [`KeyValueStore`].

use crate::{BatchOp, KeyValueStore, StorageError, Table, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::trace;

type Tables = BTreeMap<Table, BTreeMap<Vec<u8>, Vec<u8>>>;

/// A [`KeyValueStore`] held entirely in memory.
///
/// Batches are applied under a single write lock, which makes them atomic to readers.
#[derive(Debug, Default)]
pub struct MemoryDb {
    tables: RwLock<Tables>,
}

impl MemoryDb {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys in `table`.
    pub fn table_len(&self, table: Table) -> usize {
        self.tables.read().get(&table).map_or(0, BTreeMap::len)
    }
}

impl KeyValueStore for MemoryDb {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tables.read().get(&table).and_then(|t| t.get(key).cloned()))
    }

    fn entries_from(
        &self,
        table: Table,
        from: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let tables = self.tables.read();
        let Some(entries) = tables.get(&table) else {
            return Ok(Vec::new());
        };
        Ok(entries.range(from.to_vec()..).map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let ops = batch.len();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { table, key, value } => {
                    tables.entry(table).or_default().insert(key, value);
                }
                BatchOp::DeleteFrom { table, from } => {
                    if let Some(entries) = tables.get_mut(&table) {
                        drop(entries.split_off(&from));
                    }
                }
            }
        }
        trace!(target: "storage", ops, "Committed write batch");
        Ok(())
    }
}
