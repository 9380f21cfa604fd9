//! Reorg coordination.

use crate::{BlockAccumulator, BlockBuilder, InboxError, InboxLedger};
use inbox_executor::ExecutionEngine;
use inbox_protocol::SealedBlock;
use inbox_storage::{InboxDb, KeyValueStore};
use tracing::{error, info};

/// The staged result of a reorg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorgOutcome {
    /// The latest previously sealed block that survives the reorg.
    pub retained: SealedBlock,
    /// Blocks re-sealed while replaying the retained messages after `retained`.
    pub sealed: Vec<SealedBlock>,
    /// The accumulator positioned at the reorg target.
    pub accumulator: BlockAccumulator,
}

impl ReorgOutcome {
    /// Returns the new head block.
    pub fn head(&self) -> SealedBlock {
        self.sealed.last().copied().unwrap_or(self.retained)
    }
}

/// Truncates the ledger and rewinds the engine to a consistent prefix.
///
/// Blocks that contain any message at or beyond the reorg target are discarded. Messages
/// between the end of the last surviving block and the target are replayed so that the
/// accumulator reflects exactly the retained ledger.
#[derive(Debug)]
pub struct ReorgCoordinator<'a, S, E> {
    db: &'a InboxDb<S>,
    engine: &'a E,
}

impl<'a, S, E> ReorgCoordinator<'a, S, E>
where
    S: KeyValueStore,
    E: ExecutionEngine,
{
    /// Creates a coordinator over the committed blocks in `db`.
    pub const fn new(db: &'a InboxDb<S>, engine: &'a E) -> Self {
        Self { db, engine }
    }

    /// Returns the highest block in `0..=head` whose message range ends at or before `target`.
    ///
    /// Message ranges of consecutive blocks are contiguous, so block ends are monotonic and the
    /// search is a binary search over block numbers. Genesis ends at zero and always qualifies.
    pub fn retained_block(
        &self,
        head: u64,
        target: u64,
    ) -> Result<SealedBlock, InboxError<E::Error>> {
        let (mut lo, mut hi) = (0, head);
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if self.block(mid)?.header.message_end <= target {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        self.block(lo)
    }

    /// Stages a reorg of `ledger` to `target` messages, given the committed head block number.
    ///
    /// Nothing is written; the caller commits the ledger overlay and the returned blocks.
    pub fn reorg(
        &self,
        ledger: &mut InboxLedger<'_, S>,
        head: u64,
        target: u64,
    ) -> Result<ReorgOutcome, InboxError<E::Error>> {
        let length = ledger.length();
        if target > length {
            return Err(InboxError::InvalidIndex { index: target, length });
        }

        let retained = self.retained_block(head, target)?;
        let rewind = (retained.number() > 0).then_some(&retained);
        let state = self.engine.rewind_to(rewind).map_err(|err| {
            error!(
                target: "inbox::reorg",
                number = retained.number(),
                %err,
                "Failed to rewind engine"
            );
            InboxError::Engine(err)
        })?;
        if state != retained.state {
            return Err(InboxError::Corrupted(format!(
                "engine rewound block {} to {state}, expected {}",
                retained.number(),
                retained.state
            )));
        }

        ledger.truncate(target)?;

        let replay_from = retained.header.message_end;
        let delayed = ledger.delayed_messages_before(replay_from)?;
        let mut accumulator = BlockAccumulator::after(&retained, state, delayed);
        let sealed = BlockBuilder::new(self.engine)
            .build(&mut accumulator, ledger.read_range(replay_from, target)?)?;

        info!(
            target: "inbox::reorg",
            from = length,
            to = target,
            retained = retained.number(),
            discarded = head - retained.number(),
            replayed = target - replay_from,
            "Reorged inbox"
        );
        Ok(ReorgOutcome { retained, sealed, accumulator })
    }

    fn block(&self, number: u64) -> Result<SealedBlock, InboxError<E::Error>> {
        self.db
            .block(number)?
            .ok_or_else(|| InboxError::Corrupted(format!("missing sealed block {number}")))
    }
}
