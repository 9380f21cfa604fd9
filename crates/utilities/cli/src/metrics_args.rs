//! Prometheus metrics arguments.

use crate::{CliResult, init_prometheus_server};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr};

/// Configures the Prometheus exporter.
#[derive(Parser, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serve metrics over HTTP.
    #[arg(long = "metrics.enabled", env = "INBOX_METRICS_ENABLED", global = true)]
    pub enabled: bool,
    /// The address the metrics server binds to.
    #[arg(
        long = "metrics.addr",
        default_value = "0.0.0.0",
        env = "INBOX_METRICS_ADDR",
        global = true
    )]
    pub addr: IpAddr,
    /// The port the metrics server binds to. Zero picks a free port.
    #[arg(
        long = "metrics.port",
        default_value_t = MetricsArgs::DEFAULT_PORT,
        env = "INBOX_METRICS_PORT",
        global = true
    )]
    pub port: u16,
}

impl MetricsArgs {
    /// The default metrics port.
    pub const DEFAULT_PORT: u16 = 9090;

    /// Starts the exporter if metrics are enabled.
    pub fn init_metrics(&self) -> CliResult<()> {
        if self.enabled {
            init_prometheus_server(self.addr, self.port)?;
        }
        Ok(())
    }
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: Self::DEFAULT_PORT }
    }
}
