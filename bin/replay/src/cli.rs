//! Contains the replay CLI.

use crate::{flags::OverrideArgs, scenario::Scenario};
use anyhow::{Context, Result};
use clap::Parser;
use inbox_cli::{LogArgs, MetricsArgs, cli_styles, init_tracing_subscriber};
use std::{fs::File, io, path::PathBuf};
use tracing::info;

/// The inbox replay CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// Logging arguments.
    #[command(flatten)]
    pub log: LogArgs,
    /// Prometheus metrics arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
    /// Path to the JSON scenario to replay.
    #[arg(long, short = 's', env = "INBOX_SCENARIO")]
    pub scenario: PathBuf,
    /// Executor config overrides.
    #[command(flatten)]
    pub overrides: OverrideArgs,
    /// Write the report here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Initializes telemetry and replays the scenario.
    pub fn run(self) -> Result<()> {
        init_tracing_subscriber(&self.log, None)?;
        self.metrics.init_metrics()?;
        inbox_state::describe_inbox_metrics();

        self.replay()
    }

    /// Replays the scenario and writes the report.
    pub fn replay(&self) -> Result<()> {
        let mut scenario = Scenario::load(&self.scenario)?;
        scenario.executor = self.overrides.apply(scenario.executor);
        info!(
            target: "replay",
            path = %self.scenario.display(),
            steps = scenario.steps.len(),
            gas_limit = scenario.executor.block_gas_limit,
            "Replaying scenario"
        );

        let report = scenario.replay()?;
        info!(
            target: "replay",
            messages = report.message_count,
            blocks = report.blocks.len(),
            "Replay complete"
        );

        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(file, &report)?;
            }
            None => serde_json::to_writer_pretty(io::stdout().lock(), &report)?,
        }
        Ok(())
    }
}
