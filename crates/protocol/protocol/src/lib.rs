#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/inbox-rs/inbox/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

mod errors;
pub use errors::DecodeError;

mod kind;
pub use kind::{L1MessageKind, L2MessageKind};

mod message;
pub use message::{L1IncomingMessage, L1IncomingMessageHeader, MessageWithMetadata, ParsedMessage};

mod l2;
pub use l2::{ContractTx, EthDeposit, L2Message};

mod block;
pub use block::{BlockHeader, BlockRef, SealedBlock, StateHandle};

mod reader;
