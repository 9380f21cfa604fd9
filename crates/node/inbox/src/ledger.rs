//! The index-addressed record of accepted messages.

use crate::LedgerError;
use inbox_protocol::MessageWithMetadata;
use inbox_storage::{InboxBatch, InboxDb, KeyValueStore};
use tracing::{debug, warn};

/// A staged view of the inbox ledger.
///
/// The ledger is a dense sequence of [`MessageWithMetadata`] indexed from zero. An
/// [`InboxLedger`] overlays uncommitted appends and truncations on top of the committed
/// entries in an [`InboxDb`]. Nothing reaches the store until [`InboxLedger::stage`] writes the
/// overlay into an [`InboxBatch`] and that batch is committed.
#[derive(Debug)]
pub struct InboxLedger<'a, S> {
    db: &'a InboxDb<S>,
    /// The committed length this overlay started from.
    base: u64,
    /// Entries below this index are read from the store.
    retained: u64,
    /// Entries from `retained` onwards.
    staged: Vec<MessageWithMetadata>,
}

impl<'a, S: KeyValueStore> InboxLedger<'a, S> {
    /// Creates an overlay over a committed ledger of `length` entries.
    pub const fn new(db: &'a InboxDb<S>, length: u64) -> Self {
        Self { db, base: length, retained: length, staged: Vec::new() }
    }

    /// Returns the ledger length including staged changes.
    pub const fn length(&self) -> u64 {
        self.retained + self.staged.len() as u64
    }

    /// Returns the entry at `index`.
    pub fn entry(&self, index: u64) -> Result<MessageWithMetadata, LedgerError> {
        let length = self.length();
        if index >= length {
            return Err(LedgerError::InvalidIndex { index, length });
        }
        if index >= self.retained {
            return Ok(self.staged[(index - self.retained) as usize].clone());
        }
        self.db.message(index)?.ok_or(LedgerError::MissingEntry(index))
    }

    /// Returns the delayed-messages counter in effect before `index`.
    ///
    /// The counter before the first entry is zero.
    pub fn delayed_messages_before(&self, index: u64) -> Result<u64, LedgerError> {
        if index == 0 {
            return Ok(0);
        }
        Ok(self.entry(index - 1)?.delayed_messages_read)
    }

    /// Appends `messages` at `start`, returning the new length.
    ///
    /// `start` must equal the current length, and the delayed-messages counter must never
    /// decrease. Either every message is staged or none is.
    pub fn append(
        &mut self,
        start: u64,
        messages: Vec<MessageWithMetadata>,
    ) -> Result<u64, LedgerError> {
        let length = self.length();
        if start != length {
            warn!(
                target: "inbox::ledger",
                expected = length,
                got = start,
                "Append out of sequence"
            );
            return Err(LedgerError::SequenceMismatch { expected: length, got: start });
        }

        let mut previous = self.delayed_messages_before(start)?;
        for (index, message) in (start..).zip(&messages) {
            let current = message.delayed_messages_read;
            if current < previous {
                warn!(
                    target: "inbox::ledger",
                    index,
                    previous,
                    current,
                    "Delayed messages read regressed"
                );
                return Err(LedgerError::DelayedMessagesRegression { index, previous, current });
            }
            previous = current;
        }

        self.staged.extend(messages);
        Ok(self.length())
    }

    /// Drops every entry at or after `length`.
    pub fn truncate(&mut self, length: u64) -> Result<(), LedgerError> {
        let current = self.length();
        if length > current {
            return Err(LedgerError::InvalidIndex { index: length, length: current });
        }
        if length >= self.retained {
            self.staged.truncate((length - self.retained) as usize);
        } else {
            self.retained = length;
            self.staged.clear();
        }
        debug!(target: "inbox::ledger", from = current, to = length, "Truncated ledger");
        Ok(())
    }

    /// Returns an iterator over the entries in `[from, to)`.
    pub fn read_range(&self, from: u64, to: u64) -> Result<LedgerRange<'_, S>, LedgerError> {
        let length = self.length();
        if to > length {
            return Err(LedgerError::InvalidIndex { index: to, length });
        }
        if from > to {
            return Err(LedgerError::InvalidIndex { index: from, length });
        }
        Ok(LedgerRange { ledger: self, next: from, end: to })
    }

    /// Writes the overlay into `batch` and returns the resulting length.
    pub fn stage(self, batch: &mut InboxBatch) -> u64 {
        if self.retained < self.base {
            batch.delete_messages_from(self.retained);
        }
        for (index, message) in (self.retained..).zip(&self.staged) {
            batch.put_message(index, message);
        }
        let length = self.length();
        batch.set_message_count(length);
        length
    }
}

/// An iterator over a contiguous range of ledger entries, yielding `(index, entry)`.
#[derive(Debug)]
pub struct LedgerRange<'a, S> {
    ledger: &'a InboxLedger<'a, S>,
    next: u64,
    end: u64,
}

impl<S: KeyValueStore> Iterator for LedgerRange<'_, S> {
    type Item = Result<(u64, MessageWithMetadata), LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.ledger.entry(index).map(|message| (index, message)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = (self.end - self.next) as usize;
        (len, Some(len))
    }
}

impl<S: KeyValueStore> ExactSizeIterator for LedgerRange<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{BOB, deposit};
    use alloy_primitives::U256;
    use inbox_storage::MemoryDb;

    fn committed(count: u64) -> InboxDb<MemoryDb> {
        let db = InboxDb::new(MemoryDb::new());
        let mut ledger = InboxLedger::new(&db, 0);
        ledger.append(0, (0..count).map(|i| deposit(BOB, U256::from(i), i)).collect()).unwrap();
        let mut batch = InboxBatch::default();
        ledger.stage(&mut batch);
        db.commit(batch).unwrap();
        db
    }

    #[test]
    fn test_append_requires_sequence() {
        let db = committed(3);
        let mut ledger = InboxLedger::new(&db, 3);
        assert_eq!(
            ledger.append(2, vec![deposit(BOB, U256::ONE, 5)]),
            Err(LedgerError::SequenceMismatch { expected: 3, got: 2 })
        );
        assert_eq!(
            ledger.append(4, vec![deposit(BOB, U256::ONE, 5)]),
            Err(LedgerError::SequenceMismatch { expected: 3, got: 4 })
        );
        assert_eq!(ledger.append(3, vec![deposit(BOB, U256::ONE, 5)]), Ok(4));
    }

    #[test]
    fn test_append_rejects_delayed_regression_atomically() {
        let db = committed(3);
        let mut ledger = InboxLedger::new(&db, 3);
        let messages = vec![deposit(BOB, U256::ONE, 2), deposit(BOB, U256::ONE, 1)];
        assert_eq!(
            ledger.append(3, messages),
            Err(LedgerError::DelayedMessagesRegression { index: 4, previous: 2, current: 1 })
        );
        assert_eq!(ledger.length(), 3);

        // The counter of the last committed entry is the floor.
        assert_eq!(
            ledger.append(3, vec![deposit(BOB, U256::ONE, 1)]),
            Err(LedgerError::DelayedMessagesRegression { index: 3, previous: 2, current: 1 })
        );
    }

    #[test]
    fn test_reads_span_store_and_overlay() {
        let db = committed(4);
        let mut ledger = InboxLedger::new(&db, 4);
        ledger.truncate(2).unwrap();
        ledger.append(2, vec![deposit(BOB, U256::from(100), 7)]).unwrap();

        let entries = ledger.read_range(0, 3).unwrap().collect::<Result<Vec<_>, _>>().unwrap();
        let counters =
            entries.iter().map(|(i, m)| (*i, m.delayed_messages_read)).collect::<Vec<_>>();
        assert_eq!(counters, vec![(0, 0), (1, 1), (2, 7)]);
        assert_eq!(
            ledger.entry(3).unwrap_err(),
            LedgerError::InvalidIndex { index: 3, length: 3 }
        );

        // Committed state is untouched until staged.
        assert_eq!(db.message_count().unwrap(), 4);
        assert_eq!(db.message(3).unwrap().map(|m| m.delayed_messages_read), Some(3));
    }

    #[test]
    fn test_stage_truncation() {
        let db = committed(5);
        let mut ledger = InboxLedger::new(&db, 5);
        ledger.truncate(2).unwrap();
        ledger.append(2, vec![deposit(BOB, U256::ONE, 9)]).unwrap();

        let mut batch = InboxBatch::default();
        assert_eq!(ledger.stage(&mut batch), 3);
        db.commit(batch).unwrap();

        assert_eq!(db.message_count().unwrap(), 3);
        assert_eq!(db.message(2).unwrap().map(|m| m.delayed_messages_read), Some(9));
        assert_eq!(db.message(3).unwrap(), None);
        assert_eq!(db.message(4).unwrap(), None);
    }

    #[test]
    fn test_truncate_bounds() {
        let db = committed(2);
        let mut ledger = InboxLedger::new(&db, 2);
        assert_eq!(ledger.truncate(3), Err(LedgerError::InvalidIndex { index: 3, length: 2 }));
        ledger.truncate(2).unwrap();
        ledger.truncate(0).unwrap();
        assert_eq!(ledger.length(), 0);
        assert_eq!(ledger.delayed_messages_before(0), Ok(0));
    }

    #[test]
    fn test_read_range_bounds() {
        let db = committed(2);
        let ledger = InboxLedger::new(&db, 2);
        assert_eq!(ledger.read_range(2, 2).unwrap().len(), 0);
        assert!(matches!(ledger.read_range(0, 3), Err(LedgerError::InvalidIndex { index: 3, .. })));
        assert!(matches!(ledger.read_range(2, 1), Err(LedgerError::InvalidIndex { index: 2, .. })));
    }
}
