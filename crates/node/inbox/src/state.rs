//! The inbox facade.

use crate::{
    BlockAccumulator, BlockBuilder, InboxError, InboxLedger, ReorgCoordinator, metrics::Metrics,
};
use inbox_executor::ExecutionEngine;
use inbox_protocol::{MessageWithMetadata, SealedBlock, StateHandle};
use inbox_storage::{InboxBatch, InboxDb, KeyValueStore};
use parking_lot::{Mutex, RwLock};
use std::{ops::Range, sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// A consistent snapshot of the committed inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxHead {
    /// The committed ledger length.
    pub message_count: u64,
    /// The latest sealed block. Genesis if nothing has been sealed.
    pub head_block: SealedBlock,
    /// Messages applied after `head_block` that are not yet sealed.
    pub open_range: Range<u64>,
    /// The chain state after the last ledger entry, including the open block.
    pub state: StateHandle,
    /// The delayed-messages counter of the last ledger entry.
    pub delayed_messages_read: u64,
}

impl InboxHead {
    const fn new(message_count: u64, head_block: SealedBlock, acc: &BlockAccumulator) -> Self {
        Self {
            message_count,
            head_block,
            open_range: acc.open_range(),
            state: acc.state,
            delayed_messages_read: acc.delayed_messages_read,
        }
    }
}

/// The inbox state machine.
///
/// Accepts ordered messages through [`InboxState::add_messages`], folds them into blocks with
/// an [`ExecutionEngine`], and rolls the whole pipeline back on [`InboxState::reorg_to`] or on
/// a forced overwrite.
///
/// Mutations are serialized by a writer lock and become visible in a single step: the store
/// batch and the published [`InboxHead`] are swapped together under the head lock. Readers
/// never observe a ledger entry without its blocks, or a block whose messages were removed.
#[derive(Debug)]
pub struct InboxState<S, E> {
    db: InboxDb<S>,
    engine: E,
    /// The open block, owned by the writer.
    writer: Mutex<BlockAccumulator>,
    /// The committed view published to readers.
    committed: RwLock<Arc<InboxHead>>,
}

impl<S, E> InboxState<S, E>
where
    S: KeyValueStore,
    E: ExecutionEngine,
{
    /// Opens the inbox over `store`.
    ///
    /// An empty store is initialized with the engine's genesis block. A populated store is
    /// validated against the engine and the open block is rebuilt by replaying the unsealed
    /// tail of the ledger.
    pub fn open(store: S, engine: E) -> Result<Self, InboxError<E::Error>> {
        let db = InboxDb::new(store);
        let genesis = engine.genesis();
        let message_count = db.message_count()?;
        let block_count = db.block_count()?;

        match db.block(0)? {
            None if message_count == 0 && block_count == 0 => {
                let mut batch = InboxBatch::default();
                batch.put_block(&genesis);
                batch.set_block_count(0);
                batch.set_message_count(0);
                db.commit(batch)?;
                info!(target: "inbox", hash = %genesis.hash, "Initialized inbox at genesis");
            }
            None => {
                return Err(InboxError::Corrupted(format!(
                    "missing genesis with {message_count} messages and {block_count} blocks"
                )));
            }
            Some(stored) if stored.hash != genesis.hash => {
                return Err(InboxError::Corrupted(format!(
                    "stored genesis {} does not match engine genesis {}",
                    stored.hash, genesis.hash
                )));
            }
            Some(_) => {}
        }

        let head_block = db
            .block(block_count)?
            .ok_or_else(|| InboxError::Corrupted(format!("missing head block {block_count}")))?;
        if head_block.header.message_end > message_count {
            return Err(InboxError::Corrupted(format!(
                "head block {block_count} ends at message {}, ledger holds {message_count}",
                head_block.header.message_end
            )));
        }

        if let Some(stale) = db.blocks_from(block_count + 1)?.first() {
            return Err(InboxError::Corrupted(format!(
                "block {} stored beyond head block {block_count}",
                stale.number()
            )));
        }

        let rewind = (head_block.number() > 0).then_some(&head_block);
        let state = engine.rewind_to(rewind).map_err(InboxError::Engine)?;
        let ledger = InboxLedger::new(&db, message_count);
        let replay_from = head_block.header.message_end;
        let mut acc = BlockAccumulator::after(
            &head_block,
            state,
            ledger.delayed_messages_before(replay_from)?,
        );
        let sealed = BlockBuilder::new(&engine)
            .build(&mut acc, ledger.read_range(replay_from, message_count)?)?;
        if let Some(block) = sealed.first() {
            return Err(InboxError::Corrupted(format!(
                "unsealed ledger tail contains a block boundary at message {}",
                block.header.message_end - 1
            )));
        }

        info!(
            target: "inbox",
            messages = message_count,
            head = head_block.number(),
            open = ?acc.open_range(),
            "Opened inbox"
        );
        engine.prune(&head_block, acc.state);
        let head = InboxHead::new(message_count, head_block, &acc);
        Ok(Self { db, engine, writer: Mutex::new(acc), committed: RwLock::new(Arc::new(head)) })
    }

    /// Returns the execution engine.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        self.db.store()
    }

    /// Returns the committed ledger length.
    pub fn current_length(&self) -> u64 {
        self.committed.read().message_count
    }

    /// Returns the committed head snapshot.
    pub fn head(&self) -> Arc<InboxHead> {
        Arc::clone(&self.committed.read())
    }

    /// Appends `messages` at index `start`.
    ///
    /// `start` must equal [`Self::current_length`] unless `force` is set, in which case any
    /// `start` up to the current length is accepted and the ledger is first reorged to `start`.
    /// The content of the overwritten suffix is never compared: a forced overwrite always
    /// rebuilds the affected blocks.
    ///
    /// On error nothing is committed.
    pub fn add_messages(
        &self,
        start: u64,
        force: bool,
        messages: Vec<MessageWithMetadata>,
    ) -> Result<(), InboxError<E::Error>> {
        let started = Instant::now();
        let result = self.try_add_messages(start, force, messages);
        Metrics::record_add_messages(started, &result);
        result
    }

    fn try_add_messages(
        &self,
        start: u64,
        force: bool,
        messages: Vec<MessageWithMetadata>,
    ) -> Result<(), InboxError<E::Error>> {
        let mut writer = self.writer.lock();
        let head = self.head();
        let length = head.message_count;

        if start > length || (start < length && !force) {
            warn!(
                target: "inbox",
                expected = length,
                got = start,
                force,
                "Rejected messages out of sequence"
            );
            return Err(InboxError::SequenceMismatch { expected: length, got: start });
        }
        if start == length && messages.is_empty() {
            return Ok(());
        }

        let mut ledger = InboxLedger::new(&self.db, length);
        let mut batch = InboxBatch::default();
        let mut acc = *writer;
        let mut head_block = head.head_block;
        let mut sealed = Vec::new();

        if start < length {
            let outcome = ReorgCoordinator::new(&self.db, &self.engine).reorg(
                &mut ledger,
                head_block.number(),
                start,
            )?;
            batch.delete_blocks_from(outcome.retained.number() + 1);
            head_block = outcome.head();
            acc = outcome.accumulator;
            sealed = outcome.sealed;
        }

        let appended = messages.len() as u64;
        let new_length = ledger.append(start, messages)?;
        let built = BlockBuilder::new(&self.engine)
            .build(&mut acc, ledger.read_range(start, new_length)?)?;
        sealed.extend(built);
        if let Some(block) = sealed.last() {
            head_block = *block;
        }

        for block in &sealed {
            batch.put_block(block);
        }
        batch.set_block_count(head_block.number());
        ledger.stage(&mut batch);

        let next = InboxHead::new(new_length, head_block, &acc);
        self.commit(batch, next)?;
        *writer = acc;
        self.engine.prune(&head_block, acc.state);

        if start < length {
            Metrics::record_reorg(length - start);
        }
        Metrics::record_commit(appended, sealed.len(), new_length, head_block.number());
        debug!(
            target: "inbox",
            start,
            appended,
            sealed = sealed.len(),
            head = head_block.number(),
            open = ?acc.open_range(),
            "Added messages"
        );
        Ok(())
    }

    /// Truncates the ledger to `count` messages and rewinds every derived block.
    ///
    /// Blocks containing any message at or beyond `count` are discarded, and messages after
    /// the last surviving block are replayed into the open block.
    pub fn reorg_to(&self, count: u64) -> Result<(), InboxError<E::Error>> {
        let mut writer = self.writer.lock();
        let head = self.head();
        let length = head.message_count;
        if count > length {
            return Err(InboxError::InvalidIndex { index: count, length });
        }
        if count == length {
            debug!(target: "inbox", length, "Reorg to current length is a no-op");
            return Ok(());
        }

        let mut ledger = InboxLedger::new(&self.db, length);
        let outcome = ReorgCoordinator::new(&self.db, &self.engine).reorg(
            &mut ledger,
            head.head_block.number(),
            count,
        )?;

        let mut batch = InboxBatch::default();
        batch.delete_blocks_from(outcome.retained.number() + 1);
        for block in &outcome.sealed {
            batch.put_block(block);
        }
        let head_block = outcome.head();
        batch.set_block_count(head_block.number());
        ledger.stage(&mut batch);

        self.commit(batch, InboxHead::new(count, head_block, &outcome.accumulator))?;
        *writer = outcome.accumulator;
        self.engine.prune(&head_block, outcome.accumulator.state);

        Metrics::record_reorg(length - count);
        Metrics::record_commit(0, outcome.sealed.len(), count, head_block.number());
        Ok(())
    }

    /// Returns the committed block numbered `number`.
    pub fn block_by_number(
        &self,
        number: u64,
    ) -> Result<Option<SealedBlock>, InboxError<E::Error>> {
        let committed = self.committed.read();
        if number > committed.head_block.number() {
            return Ok(None);
        }
        Ok(self.db.block(number)?)
    }

    /// Returns the committed block that folded the message at `index`.
    ///
    /// Messages in the open block, or beyond the ledger, have no block yet.
    pub fn block_for_message(
        &self,
        index: u64,
    ) -> Result<Option<SealedBlock>, InboxError<E::Error>> {
        let committed = self.committed.read();
        if index >= committed.head_block.header.message_end {
            return Ok(None);
        }
        let before = ReorgCoordinator::new(&self.db, &self.engine)
            .retained_block(committed.head_block.number(), index)?;
        let block = self.db.block(before.number() + 1)?.ok_or_else(|| {
            InboxError::Corrupted(format!("missing sealed block {}", before.number() + 1))
        })?;
        Ok(Some(block))
    }

    /// Returns the committed ledger entry at `index`.
    pub fn message(&self, index: u64) -> Result<Option<MessageWithMetadata>, InboxError<E::Error>> {
        let committed = self.committed.read();
        if index >= committed.message_count {
            return Ok(None);
        }
        Ok(self.db.message(index)?)
    }

    /// Writes `batch` and publishes `head` in one step.
    fn commit(&self, batch: InboxBatch, head: InboxHead) -> Result<(), InboxError<E::Error>> {
        let mut committed = self.committed.write();
        self.db.commit(batch)?;
        *committed = Arc::new(head);
        Ok(())
    }
}
