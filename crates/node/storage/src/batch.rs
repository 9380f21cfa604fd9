//! Atomic write batches.

use crate::Table;

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key.
    Put {
        /// The target table.
        table: Table,
        /// The key.
        key: Vec<u8>,
        /// The value.
        value: Vec<u8>,
    },
    /// Remove every key greater than or equal to `from`.
    DeleteFrom {
        /// The target table.
        table: Table,
        /// The first key removed.
        from: Vec<u8>,
    },
}

/// An ordered list of mutations committed atomically by [`crate::KeyValueStore::write`].
///
/// Operations apply in insertion order, so a `Put` staged after a `DeleteFrom` covering the
/// same key survives the commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Stages a put.
    pub fn put(&mut self, table: Table, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put { table, key: key.into(), value: value.into() });
    }

    /// Stages a range delete of every key `>= from`.
    pub fn delete_from(&mut self, table: Table, from: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::DeleteFrom { table, from: from.into() });
    }

    /// Returns the number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the batch, returning its operations.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
