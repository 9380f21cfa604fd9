//! Scenario files and their replay.

use alloy_primitives::{Address, Bytes, U256};
use anyhow::{Context, Result};
use inbox_executor::{BalanceEngine, ExecutorConfig, GenesisConfig};
use inbox_protocol::{
    ContractTx, EthDeposit, L1IncomingMessage, L1IncomingMessageHeader, L1MessageKind,
    L2Message, MessageWithMetadata, SealedBlock,
};
use inbox_state::InboxState;
use inbox_storage::MemoryDb;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs::File, io::BufReader, ops::Range, path::Path};
use tracing::{debug, info};

/// A scripted sequence of inbox operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// The initial chain state.
    #[serde(default)]
    pub genesis: GenesisConfig,
    /// The engine configuration.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// The operations to replay, in order.
    pub steps: Vec<Step>,
}

/// One inbox operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Appends messages at `start`, replacing the suffix from `start` when `force` is set.
    Add {
        /// The ledger index of the first message.
        start: u64,
        /// Allow overwriting existing entries.
        #[serde(default)]
        force: bool,
        /// The messages to append.
        messages: Vec<ScenarioMessage>,
    },
    /// Truncates the ledger to `target` messages.
    Reorg {
        /// The new ledger length.
        target: u64,
    },
}

/// A message in scenario form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMessage {
    /// What the message does.
    #[serde(flatten)]
    pub payload: Payload,
    /// Close the block after this message.
    #[serde(default)]
    pub must_end_block: bool,
    /// The delayed-messages counter as of this message.
    #[serde(default)]
    pub delayed_messages_read: u64,
    /// The outer-layer block number.
    #[serde(default)]
    pub block_number: u64,
    /// The outer-layer timestamp.
    #[serde(default)]
    pub timestamp: u64,
}

/// The payload of a [`ScenarioMessage`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Payload {
    /// A value transfer encoded as a contract transaction.
    Transfer {
        /// The sender.
        from: Address,
        /// The recipient.
        to: Address,
        /// The amount moved.
        value: U256,
        /// The gas charged against the block.
        #[serde(default = "default_gas_limit")]
        gas_limit: u64,
    },
    /// A deposit from the outer layer.
    Deposit {
        /// The credited account.
        to: Address,
        /// The deposited amount.
        value: U256,
    },
    /// A block-closing marker.
    EndOfBlock,
    /// An arbitrary envelope.
    Raw {
        /// The message kind.
        kind: L1MessageKind,
        /// The sender.
        sender: Address,
        /// The payload bytes.
        #[serde(default)]
        l2msg: Bytes,
    },
}

const fn default_gas_limit() -> u64 {
    21_000
}

impl ScenarioMessage {
    /// Encodes the message into its ledger form.
    pub fn into_message(self) -> MessageWithMetadata {
        let (kind, sender, l2msg) = match self.payload {
            Payload::Transfer { from, to, value, gas_limit } => {
                let tx = ContractTx {
                    gas_limit,
                    destination: to,
                    value,
                    ..Default::default()
                };
                (L1MessageKind::L2Message, from, L2Message::ContractTx(tx).encode().into())
            }
            Payload::Deposit { to, value } => {
                let payload = EthDeposit { destination: to, value }.encode();
                (L1MessageKind::EthDeposit, to, payload.into())
            }
            Payload::EndOfBlock => (L1MessageKind::EndOfBlock, Address::ZERO, Bytes::new()),
            Payload::Raw { kind, sender, l2msg } => (kind, sender, l2msg),
        };
        let header = L1IncomingMessageHeader {
            kind,
            sender,
            block_number: self.block_number,
            timestamp: self.timestamp,
            request_id: None,
        };
        MessageWithMetadata::new(
            L1IncomingMessage::new(header, l2msg),
            self.must_end_block,
            self.delayed_messages_read,
        )
    }
}

impl Scenario {
    /// Reads a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open scenario {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Replays every step against a fresh in-memory inbox.
    pub fn replay(self) -> Result<ReplayReport> {
        let engine = BalanceEngine::new(self.executor, &self.genesis);
        let inbox = InboxState::open(MemoryDb::new(), engine)?;

        for (index, step) in self.steps.into_iter().enumerate() {
            match step {
                Step::Add { start, force, messages } => {
                    let messages = messages
                        .into_iter()
                        .map(ScenarioMessage::into_message)
                        .collect::<Vec<_>>();
                    debug!(
                        target: "replay",
                        step = index,
                        start,
                        force,
                        count = messages.len(),
                        "Adding messages"
                    );
                    inbox
                        .add_messages(start, force, messages)
                        .with_context(|| format!("step {index}: add at {start} failed"))?;
                }
                Step::Reorg { target } => {
                    debug!(target: "replay", step = index, target, "Reorging");
                    inbox
                        .reorg_to(target)
                        .with_context(|| format!("step {index}: reorg to {target} failed"))?;
                }
            }
            let head = inbox.head();
            info!(
                target: "replay",
                step = index,
                messages = head.message_count,
                head = head.head_block.number(),
                open = ?head.open_range,
                "Applied step"
            );
        }

        ReplayReport::collect(&inbox)
    }
}

/// The final inbox state after a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// The ledger length.
    pub message_count: u64,
    /// Messages applied but not yet sealed.
    pub open_range: Range<u64>,
    /// Every sealed block, genesis first.
    pub blocks: Vec<SealedBlock>,
    /// Non-zero balances after the last message.
    pub balances: BTreeMap<Address, U256>,
}

impl ReplayReport {
    fn collect(inbox: &InboxState<MemoryDb, BalanceEngine>) -> Result<Self> {
        let head = inbox.head();
        let blocks = (0..=head.head_block.number())
            .map(|number| {
                inbox
                    .block_by_number(number)?
                    .with_context(|| format!("block {number} missing from the committed chain"))
            })
            .collect::<Result<Vec<_>>>()?;
        let balances = inbox.engine().balances(head.state)?;
        Ok(Self {
            message_count: head.message_count,
            open_range: head.open_range.clone(),
            blocks,
            balances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"{
        "genesis": { "alloc": { "0x00000000000000000000000000000000000000aa": "0x3e8" } },
        "executor": { "blockGasLimit": 42000 },
        "steps": [
            { "add": { "start": 0, "messages": [
                { "type": "transfer", "from": "0x00000000000000000000000000000000000000aa",
                  "to": "0x00000000000000000000000000000000000000bb", "value": "0x64" },
                { "type": "deposit", "to": "0x00000000000000000000000000000000000000bb",
                  "value": "0x1", "mustEndBlock": true },
                { "type": "transfer", "from": "0x00000000000000000000000000000000000000aa",
                  "to": "0x00000000000000000000000000000000000000cc", "value": "0xa" },
                { "type": "transfer", "from": "0x00000000000000000000000000000000000000aa",
                  "to": "0x00000000000000000000000000000000000000cc", "value": "0xa" },
                { "type": "endOfBlock" }
            ] } },
            { "reorg": { "target": 3 } },
            { "add": { "start": 3, "messages": [ { "type": "deposit",
                "to": "0x00000000000000000000000000000000000000cc", "value": "0x5" } ] } }
        ]
    }"#;

    fn addr(byte: u8) -> Address {
        Address::with_last_byte(byte)
    }

    #[test]
    fn test_load_and_replay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();

        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.executor.block_gas_limit, 42_000);
        assert_eq!(scenario.steps.len(), 3);

        let report = scenario.replay().unwrap();
        assert_eq!(report.message_count, 4);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[1].message_range(), 0..2);
        assert_eq!(report.open_range, 2..4);
        assert_eq!(report.balances.get(&addr(0xaa)), Some(&U256::from(890)));
        assert_eq!(report.balances.get(&addr(0xbb)), Some(&U256::from(101)));
        assert_eq!(report.balances.get(&addr(0xcc)), Some(&U256::from(15)));
    }

    #[test]
    fn test_failing_step_reports_index() {
        let scenario: Scenario = serde_json::from_str(
            r#"{ "steps": [ { "reorg": { "target": 1 } } ] }"#,
        )
        .unwrap();
        let err = scenario.replay().unwrap_err();
        assert!(format!("{err:#}").contains("step 0: reorg to 1 failed"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Scenario::load(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_report_serializes_blocks() {
        let report = Scenario::default().replay().unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["messageCount"], 0);
        assert_eq!(json["blocks"].as_array().map(Vec::len), Some(1));
    }
}
