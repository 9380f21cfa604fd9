//! Error types for the inbox.

use inbox_storage::StorageError;
use thiserror::Error;

/// A [Result] type for the [`InboxError`].
pub type InboxResult<T, E> = Result<T, InboxError<E>>;

/// Errors returned by [`crate::InboxState`].
///
/// Every error is returned before anything is committed, so the ledger, the block list and
/// the chain head are unchanged after a failed call.
#[derive(Error, Debug)]
pub enum InboxError<E>
where
    E: core::error::Error + 'static,
{
    /// The caller's start index disagrees with the ledger length.
    #[error("Sequence mismatch: ledger length is {expected}, got start index {got}")]
    SequenceMismatch {
        /// The current ledger length.
        expected: u64,
        /// The start index supplied by the caller.
        got: u64,
    },
    /// An index outside the valid range of the ledger.
    #[error("Invalid index {index}: ledger length is {length}")]
    InvalidIndex {
        /// The offending index.
        index: u64,
        /// The current ledger length.
        length: u64,
    },
    /// A message's delayed-messages counter is lower than its predecessor's.
    #[error("Delayed messages read decreased at message {index}: {previous} -> {current}")]
    DelayedMessagesRegression {
        /// The index of the offending message.
        index: u64,
        /// The predecessor's counter.
        previous: u64,
        /// The offending counter.
        current: u64,
    },
    /// The engine failed to apply a message. The whole batch was rolled back.
    #[error("Execution failed at message {index}: {source}")]
    Execution {
        /// The index of the message that failed.
        index: u64,
        /// The engine error.
        source: E,
    },
    /// The engine failed outside of message application.
    #[error("Engine error: {0}")]
    Engine(E),
    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Persisted state contradicts itself.
    #[error("Inconsistent inbox state: {0}")]
    Corrupted(String),
}

/// Errors returned by [`crate::InboxLedger`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// `append` was called with a start index other than the ledger length.
    #[error("Sequence mismatch: ledger length is {expected}, got start index {got}")]
    SequenceMismatch {
        /// The current ledger length.
        expected: u64,
        /// The start index supplied by the caller.
        got: u64,
    },
    /// An index outside the valid range of the ledger.
    #[error("Invalid index {index}: ledger length is {length}")]
    InvalidIndex {
        /// The offending index.
        index: u64,
        /// The current ledger length.
        length: u64,
    },
    /// A message's delayed-messages counter is lower than its predecessor's.
    #[error("Delayed messages read decreased at message {index}: {previous} -> {current}")]
    DelayedMessagesRegression {
        /// The index of the offending message.
        index: u64,
        /// The predecessor's counter.
        previous: u64,
        /// The offending counter.
        current: u64,
    },
    /// An index below the ledger length has no stored entry.
    #[error("Missing ledger entry {0}")]
    MissingEntry(u64),
    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl<E> From<LedgerError> for InboxError<E>
where
    E: core::error::Error + 'static,
{
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::SequenceMismatch { expected, got } => {
                Self::SequenceMismatch { expected, got }
            }
            LedgerError::InvalidIndex { index, length } => Self::InvalidIndex { index, length },
            LedgerError::DelayedMessagesRegression { index, previous, current } => {
                Self::DelayedMessagesRegression { index, previous, current }
            }
            LedgerError::MissingEntry(index) => {
                Self::Corrupted(format!("missing ledger entry {index}"))
            }
            LedgerError::Storage(err) => Self::Storage(err),
        }
    }
}
