//! Engine and genesis configuration.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tunables for the [`crate::BalanceEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Once the gas charged to the open block reaches this limit, the engine ends the block.
    pub block_gas_limit: u64,
    /// The maximum nesting of batch payloads.
    pub max_batch_depth: usize,
}

impl ExecutorConfig {
    /// The default per-block gas limit.
    pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 32_000_000;
    /// The default batch nesting limit.
    pub const DEFAULT_MAX_BATCH_DEPTH: usize = 16;
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            block_gas_limit: Self::DEFAULT_BLOCK_GAS_LIMIT,
            max_batch_depth: Self::DEFAULT_MAX_BATCH_DEPTH,
        }
    }
}

/// The initial chain state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisConfig {
    /// Initial account balances.
    #[serde(default)]
    pub alloc: BTreeMap<Address, U256>,
    /// The genesis timestamp.
    #[serde(default)]
    pub timestamp: u64,
}

impl GenesisConfig {
    /// Creates a genesis with a single funded account.
    pub fn with_account(account: Address, balance: U256) -> Self {
        Self { alloc: BTreeMap::from([(account, balance)]), timestamp: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_config_defaults_missing_fields() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"blockGasLimit": 250000}"#).unwrap();
        assert_eq!(config.block_gas_limit, 250_000);
        assert_eq!(config.max_batch_depth, ExecutorConfig::DEFAULT_MAX_BATCH_DEPTH);
    }

    #[test]
    fn test_genesis_from_json() {
        let genesis: GenesisConfig = serde_json::from_str(
            r#"{
                "alloc": {"0x1111111111111111111111111111111111111111": "0xde0b6b3a7640000"},
                "timestamp": 1633932474
            }"#,
        )
        .unwrap();
        assert_eq!(genesis.timestamp, 1_633_932_474);
        assert_eq!(genesis.alloc.values().next(), Some(&U256::from(1_000_000_000_000_000_000u64)));
    }
}
