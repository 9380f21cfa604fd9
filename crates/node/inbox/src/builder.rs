//! Folding ledger entries into blocks.

use crate::{InboxError, LedgerError};
use inbox_executor::ExecutionEngine;
use inbox_protocol::{MessageWithMetadata, SealedBlock, StateHandle};
use std::ops::Range;
use tracing::{debug, error, trace};

/// The block currently being built.
///
/// Messages in `[start, next)` have been applied to `state` but not yet sealed. When
/// `start == next` no block is open and `state` is the post-seal state of the last block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAccumulator {
    /// The first message index of the open block.
    pub start: u64,
    /// The next message index to apply.
    pub next: u64,
    /// The chain state after the last applied message.
    pub state: StateHandle,
    /// The delayed-messages counter of the last applied message.
    pub delayed_messages_read: u64,
}

impl BlockAccumulator {
    /// Returns an empty accumulator positioned right after `block`.
    pub const fn after(
        block: &SealedBlock,
        state: StateHandle,
        delayed_messages_read: u64,
    ) -> Self {
        let end = block.header.message_end;
        Self { start: end, next: end, state, delayed_messages_read }
    }

    /// Returns `true` if no message is pending.
    pub const fn is_empty(&self) -> bool {
        self.start == self.next
    }

    /// Returns the message range applied but not yet sealed.
    pub const fn open_range(&self) -> Range<u64> {
        self.start..self.next
    }
}

/// Applies ledger entries through an [`ExecutionEngine`] and seals blocks at boundaries.
///
/// A block ends right after a message that carries `must_end_block`, or when the engine
/// reports [`inbox_executor::BlockBoundary::End`]. Either trigger is sufficient.
#[derive(Debug)]
pub struct BlockBuilder<'a, E> {
    engine: &'a E,
}

impl<'a, E: ExecutionEngine> BlockBuilder<'a, E> {
    /// Creates a builder driving `engine`.
    pub const fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Folds `entries` into `acc`, returning the blocks sealed along the way.
    ///
    /// Entries must continue at `acc.next`. On error `acc` is left untouched; any chain
    /// states the engine created for the failed fold are simply never referenced.
    pub fn build<I>(
        &self,
        acc: &mut BlockAccumulator,
        entries: I,
    ) -> Result<Vec<SealedBlock>, InboxError<E::Error>>
    where
        I: IntoIterator<Item = Result<(u64, MessageWithMetadata), LedgerError>>,
    {
        let mut working = *acc;
        let mut sealed = Vec::new();

        for entry in entries {
            let (index, message) = entry?;
            if index != working.next {
                return Err(InboxError::Corrupted(format!(
                    "builder expected message {}, got {index}",
                    working.next
                )));
            }

            let outcome = self.engine.apply_message(working.state, &message).map_err(|source| {
                error!(target: "inbox::builder", index, %source, "Failed to apply message");
                InboxError::Execution { index, source }
            })?;
            trace!(target: "inbox::builder", index, state = %outcome.state, "Applied message");

            working.state = outcome.state;
            working.next = index + 1;
            working.delayed_messages_read = message.delayed_messages_read;

            if message.must_end_block || outcome.boundary.is_end() {
                let block = self.seal(&working)?;
                working.start = working.next;
                working.state = block.state;
                sealed.push(block);
            }
        }

        *acc = working;
        Ok(sealed)
    }

    fn seal(&self, acc: &BlockAccumulator) -> Result<SealedBlock, InboxError<E::Error>> {
        let block = self.engine.seal_block(acc.state, acc.open_range()).map_err(|err| {
            error!(
                target: "inbox::builder",
                range = ?acc.open_range(),
                %err,
                "Failed to seal block"
            );
            InboxError::Engine(err)
        })?;
        if block.message_range() != acc.open_range() {
            return Err(InboxError::Corrupted(format!(
                "engine sealed block {} over {:?}, expected {:?}",
                block.number(),
                block.message_range(),
                acc.open_range()
            )));
        }
        debug!(
            target: "inbox::builder",
            number = block.number(),
            hash = %block.hash,
            messages = ?block.message_range(),
            "Sealed block"
        );
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ALICE, BOB, deposit, end_of_block, engine, ending, transfer};
    use alloy_primitives::U256;
    use inbox_executor::{BalanceEngine, ExecutorConfig, ExecutorError, GenesisConfig};
    use rstest::rstest;

    fn entries(
        start: u64,
        messages: Vec<MessageWithMetadata>,
    ) -> impl Iterator<Item = Result<(u64, MessageWithMetadata), LedgerError>> {
        (start..).zip(messages).map(Ok)
    }

    fn genesis_acc<E: ExecutionEngine>(engine: &E) -> BlockAccumulator {
        let genesis = engine.genesis();
        BlockAccumulator::after(&genesis, genesis.state, 0)
    }

    #[test]
    fn test_must_end_block_seals() {
        let engine = engine();
        let mut acc = genesis_acc(&engine);
        let messages = vec![
            transfer(ALICE, BOB, 1),
            ending(transfer(ALICE, BOB, 2)),
            transfer(ALICE, BOB, 3),
        ];
        let blocks = BlockBuilder::new(&engine).build(&mut acc, entries(0, messages)).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].number(), 1);
        assert_eq!(blocks[0].message_range(), 0..2);
        assert_eq!(acc.open_range(), 2..3);
        assert_ne!(acc.state, blocks[0].state);
    }

    #[rstest]
    #[case::end_of_block_message(end_of_block())]
    #[case::flagged_deposit(ending(deposit(BOB, U256::ONE, 0)))]
    fn test_boundary_triggers(#[case] last: MessageWithMetadata) {
        let engine = engine();
        let mut acc = genesis_acc(&engine);
        let blocks = BlockBuilder::new(&engine)
            .build(&mut acc, entries(0, vec![transfer(ALICE, BOB, 1), last]))
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].message_range(), 0..2);
        assert!(acc.is_empty());
        assert_eq!(acc.state, blocks[0].state);
    }

    #[test]
    fn test_engine_gas_limit_boundary() {
        let config = ExecutorConfig { block_gas_limit: 42_000, ..Default::default() };
        let genesis = GenesisConfig::with_account(ALICE, U256::from(100));
        let engine = BalanceEngine::new(config, &genesis);
        let mut acc = genesis_acc(&engine);
        let transfers = (0..5).map(|_| transfer(ALICE, BOB, 1)).collect();
        let blocks = BlockBuilder::new(&engine).build(&mut acc, entries(0, transfers)).unwrap();

        let ranges = blocks.iter().map(SealedBlock::message_range).collect::<Vec<_>>();
        assert_eq!(ranges, vec![0..2, 2..4]);
        assert_eq!(acc.open_range(), 4..5);
    }

    #[test]
    fn test_failure_leaves_accumulator_untouched() {
        let engine = engine();
        let mut acc = genesis_acc(&engine);
        let before = acc;
        let err = BlockBuilder::new(&engine)
            .build(
                &mut acc,
                entries(0, vec![ending(transfer(ALICE, BOB, 1)), transfer(BOB, ALICE, 1_000)]),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            InboxError::Execution { index: 1, source: ExecutorError::InsufficientBalance { .. } }
        ));
        assert_eq!(acc, before);
    }

    #[test]
    fn test_rejects_gap() {
        let engine = engine();
        let mut acc = genesis_acc(&engine);
        let err = BlockBuilder::new(&engine)
            .build(&mut acc, entries(1, vec![transfer(ALICE, BOB, 1)]))
            .unwrap_err();
        assert!(matches!(err, InboxError::Corrupted(_)));
    }

    #[test]
    fn test_tracks_delayed_counter() {
        let engine = engine();
        let mut acc = genesis_acc(&engine);
        let messages = vec![deposit(BOB, U256::ONE, 3), deposit(BOB, U256::ONE, 4)];
        BlockBuilder::new(&engine).build(&mut acc, entries(0, messages)).unwrap();
        assert_eq!(acc.delayed_messages_read, 4);
    }
}
