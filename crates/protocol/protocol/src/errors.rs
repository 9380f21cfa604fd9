//! Error types for the message codec.

use thiserror::Error;

/// An error raised while decoding a message envelope or an embedded L2 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended before a fixed-size field could be read.
    #[error("unexpected end of input: needed {expected} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// The number of bytes the field required.
        expected: usize,
        /// The number of bytes left in the input.
        remaining: usize,
    },
    /// The envelope kind byte does not name a known [`crate::L1MessageKind`].
    #[error("unknown L1 message kind: {0}")]
    UnknownKind(u8),
    /// The L2 payload kind byte does not name a known [`crate::L2MessageKind`].
    #[error("unknown L2 message kind: {0}")]
    UnknownL2Kind(u8),
    /// A 32-byte big-endian word did not fit the target integer.
    #[error("value for `{0}` overflows u64")]
    Overflow(&'static str),
    /// A left-padded address word had non-zero padding.
    #[error("address word has non-zero padding")]
    InvalidAddress,
    /// A batch nests deeper than the configured limit.
    #[error("batch nesting exceeds max depth {0}")]
    BatchTooDeep(usize),
    /// The payload was empty where a kind byte was expected.
    #[error("empty payload")]
    Empty,
}
