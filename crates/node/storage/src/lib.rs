#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/inbox-rs/inbox/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::StorageError;

mod models;
pub use models::Table;

mod batch;
pub use batch::{BatchOp, WriteBatch};

mod traits;
pub use traits::KeyValueStore;

mod memory;
pub use memory::MemoryDb;

mod chaindb;
pub use chaindb::{InboxBatch, InboxDb};
