//! Logging arguments.

use clap::{ArgAction, Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

/// The output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one event per line with all fields.
    #[default]
    Full,
    /// Abbreviated human readable output.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Logging arguments, flattened into a binary's top-level arguments.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level (0-4): error, warn, info, debug, trace.
    #[arg(
        short = 'v',
        long = "verbosity",
        action = ArgAction::Count,
        default_value = "2",
        global = true
    )]
    pub verbosity: u8,
    /// The log output format.
    #[arg(long = "log.format", default_value = "full", env = "INBOX_LOG_FORMAT", global = true)]
    pub format: LogFormat,
}

impl Default for LogArgs {
    fn default() -> Self {
        Self { verbosity: 2, format: LogFormat::Full }
    }
}

impl LogArgs {
    /// Returns the default level filter for the configured verbosity.
    pub const fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        log: LogArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.log, LogArgs::default());
        assert_eq!(cli.log.level(), LevelFilter::INFO);
    }

    #[rstest]
    #[case(&["test", "-v"], LevelFilter::WARN)]
    #[case(&["test", "-vvv"], LevelFilter::DEBUG)]
    #[case(&["test", "-vvvvvv"], LevelFilter::TRACE)]
    fn test_verbosity(#[case] args: &[&str], #[case] level: LevelFilter) {
        let cli = TestCli::try_parse_from(args).unwrap();
        assert_eq!(cli.log.level(), level);
    }

    #[test]
    fn test_format() {
        let cli = TestCli::try_parse_from(["test", "--log.format", "json"]).unwrap();
        assert_eq!(cli.log.format, LogFormat::Json);
        assert!(TestCli::try_parse_from(["test", "--log.format", "xml"]).is_err());
    }
}
