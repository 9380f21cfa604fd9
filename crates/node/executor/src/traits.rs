//! The execution engine interface.

use inbox_protocol::{MessageWithMetadata, SealedBlock, StateHandle};
use std::ops::Range;

/// Whether the engine wants the current block closed after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockBoundary {
    /// The block may keep accumulating messages.
    #[default]
    Continue,
    /// The block must be sealed after this message.
    End,
}

impl BlockBoundary {
    /// Returns `true` if the engine asked for the block to end.
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

/// The result of applying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The chain state after the message.
    pub state: StateHandle,
    /// The engine's block boundary signal.
    pub boundary: BlockBoundary,
}

/// Turns messages into chain state transitions and sealed blocks.
///
/// Chain states are owned by the engine and referred to by [`StateHandle`]. Every method
/// takes `&self`; implementations synchronize internally. The inbox only calls into the
/// engine from inside its writer critical section, so calls never interleave.
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait ExecutionEngine {
    /// The engine's error type. Any error is treated as unrecoverable for the current batch.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Returns the genesis block. Its state is the starting point for every fold.
    fn genesis(&self) -> SealedBlock;

    /// Applies `message` on top of `state`.
    fn apply_message(
        &self,
        state: StateHandle,
        message: &MessageWithMetadata,
    ) -> Result<ApplyOutcome, Self::Error>;

    /// Seals the messages applied since the last sealed block into a block covering `messages`.
    fn seal_block(
        &self,
        state: StateHandle,
        messages: Range<u64>,
    ) -> Result<SealedBlock, Self::Error>;

    /// Returns the chain state right after `block` was sealed, or the genesis state for
    /// [`None`].
    fn rewind_to(&self, block: Option<&SealedBlock>) -> Result<StateHandle, Self::Error>;

    /// Releases chain states the inbox can no longer reach.
    ///
    /// Called after every commit with the committed head block and the state of the open
    /// block. Afterwards only the states of `head`, its ancestors and `open` need to stay
    /// resolvable.
    fn prune(&self, _head: &SealedBlock, _open: StateHandle) {}
}
