#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/inbox-rs/inbox/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod errors;
pub use errors::{InboxError, InboxResult, LedgerError};

mod ledger;
pub use ledger::{InboxLedger, LedgerRange};

mod builder;
pub use builder::{BlockAccumulator, BlockBuilder};

mod reorg;
pub use reorg::{ReorgCoordinator, ReorgOutcome};

mod state;
pub use state::{InboxHead, InboxState};

mod metrics;
pub use metrics::describe_inbox_metrics;

#[cfg(test)]
pub(crate) mod test_utils;
