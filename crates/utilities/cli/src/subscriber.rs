//! Global tracing subscriber setup.

use crate::{CliError, CliResult, LogArgs, LogFormat};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Without an explicit `filter`, `RUST_LOG` directives apply on top of the level selected by
/// the verbosity flag.
pub fn init_tracing_subscriber(args: &LogArgs, filter: Option<EnvFilter>) -> CliResult<()> {
    let filter = filter.unwrap_or_else(|| {
        EnvFilter::builder().with_default_directive(args.level().into()).from_env_lossy()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match args.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(CliError::Tracing)
}
