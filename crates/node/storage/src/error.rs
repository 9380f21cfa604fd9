use crate::Table;
use thiserror::Error;

/// Errors that may occur while interacting with inbox storage.
///
/// This enum is used across all implementations of [`crate::KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backing store failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("Failed to decode {table} entry: {source}")]
    Decode {
        /// The table holding the entry.
        table: Table,
        /// The decoding failure.
        #[source]
        source: alloy_rlp::Error,
    },

    /// A stored counter has the wrong width.
    #[error("Malformed counter `{0}`")]
    MalformedCounter(&'static str),
}
