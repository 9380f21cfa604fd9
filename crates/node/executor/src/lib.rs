#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/inbox-rs/inbox/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod traits;
pub use traits::{ApplyOutcome, BlockBoundary, ExecutionEngine};

mod config;
pub use config::{ExecutorConfig, GenesisConfig};

mod errors;
pub use errors::ExecutorError;

mod balance;
pub use balance::BalanceEngine;
