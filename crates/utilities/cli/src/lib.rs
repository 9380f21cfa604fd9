#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/inbox-rs/inbox/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod backtrace;

mod error;
pub use error::{CliError, CliResult, PrometheusError};

pub mod log;
pub use log::{LogArgs, LogFormat};

pub mod metrics_args;
pub use metrics_args::MetricsArgs;

mod prometheus;
pub use prometheus::init_prometheus_server;

mod styles;
pub use styles::cli_styles;

mod subscriber;
pub use subscriber::init_tracing_subscriber;
