//! Replays a scenario of message additions and reorgs against an in-memory inbox.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod cli;
pub mod flags;
pub mod scenario;

use clap::Parser;

fn main() {
    inbox_cli::backtrace::enable();

    if let Err(err) = cli::Cli::parse().run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
