//! Flags that override scenario configuration.

use clap::Parser;
use inbox_executor::ExecutorConfig;

/// Overrides applied on top of the scenario's executor config.
#[derive(Parser, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideArgs {
    /// Override the per-block gas limit.
    #[arg(long, env = "INBOX_BLOCK_GAS_LIMIT")]
    pub block_gas_limit: Option<u64>,
    /// Override the maximum batch nesting depth.
    #[arg(long, env = "INBOX_MAX_BATCH_DEPTH")]
    pub max_batch_depth: Option<usize>,
}

impl OverrideArgs {
    /// Applies the overrides to `config`.
    pub fn apply(&self, config: ExecutorConfig) -> ExecutorConfig {
        ExecutorConfig {
            block_gas_limit: self.block_gas_limit.unwrap_or(config.block_gas_limit),
            max_batch_depth: self.max_batch_depth.unwrap_or(config.max_batch_depth),
        }
    }
}
