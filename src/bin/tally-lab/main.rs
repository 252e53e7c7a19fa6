//! Tally lab - watch a mutex protect a shared vote tally, then turn it off.
//!
//! Runs vote bursts against an in-process tally and prints the activity
//! stream (lock hand-offs, counter reads and writes, commits and rejections)
//! followed by the final counts.
//!
//! # Usage
//!
//! ```bash
//! # Everyone on the roster votes at once, lock enabled
//! tally-lab stress
//!
//! # Same burst without the lock, everyone on one category
//! tally-lab stress --unprotected --category average
//!
//! # Individual votes, second one is a duplicate
//! tally-lab vote --actor Student_101 --category delicious --actor Student_101 --category poor
//!
//! # Two overlapping votes, with and without the lock
//! tally-lab lost-update
//!
//! # JSON lines for scripting
//! tally-lab --json stress | jq 'select(.kind == "lock-blocked")'
//! ```
//!
//! Configuration layers: defaults < TOML (`--config` or `TALLY_CONFIG_FILE`)
//! < `TALLY_*` environment < flags.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// Initialize tracing subscriber with environment-based filtering.
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).compact().init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.global.is_quiet, cli.global.is_verbose);

    cli.run().await
}
