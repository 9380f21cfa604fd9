use crate::{StorageError, Table, WriteBatch};

/// Provides an interface to the persistent key/value store backing the inbox.
///
/// Implementations must apply a [`WriteBatch`] atomically: after [`Self::write`] returns,
/// readers observe either none or all of its operations. A failed write must leave the
/// store unchanged.
///
/// Implementations are expected to provide thread-safe access.
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait KeyValueStore {
    /// Reads the value stored under `key` in `table`.
    ///
    /// # Returns
    /// * `Ok(Some(value))` if the key exists.
    /// * `Ok(None)` if it does not.
    /// * `Err(StorageError)` if the store could not be read.
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns every entry of `table` whose key is at or after `from`, in key order.
    fn entries_from(
        &self,
        table: Table,
        from: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Atomically applies every operation in `batch`, in order.
    fn write(&self, batch: WriteBatch) -> Result<(), StorageError>;
}
