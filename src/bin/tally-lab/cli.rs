//! CLI argument parsing and command dispatch.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tally::ConfigOverrides;
use tally::TallyConfig;

use crate::commands::lost_update::LostUpdateArgs;
use crate::commands::stress::StressArgs;
use crate::commands::vote::VoteArgs;

/// Command-line interface for the tally lab.
#[derive(Parser)]
#[command(name = "tally-lab")]
#[command(version)]
#[command(about = "Mutual exclusion over a shared vote tally")]
#[command(long_about = "Runs concurrent votes against a shared tally guarded by a FIFO mutex. \
    The mutex can be switched off to reproduce lost updates.")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global options available to all commands.
#[derive(Args, Clone)]
pub struct GlobalOptions {
    /// Path to TOML configuration file.
    ///
    /// Can also be set via TALLY_CONFIG_FILE.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Comma-separated roster, in join order.
    #[arg(long, value_delimiter = ',', global = true)]
    pub roster: Option<Vec<String>>,

    /// Number of events retained in the log.
    #[arg(long = "event-log-capacity", global = true)]
    pub event_log_capacity: Option<u32>,

    /// Print events and results as JSON.
    #[arg(long = "json", global = true)]
    pub is_json: bool,

    /// Enable debug logging.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub is_verbose: bool,

    /// Suppress all logging output.
    #[arg(short = 'q', long = "quiet", global = true)]
    pub is_quiet: bool,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Every unvoted actor on the roster votes at once.
    Stress(StressArgs),

    /// Cast votes one after another.
    Vote(VoteArgs),

    /// Two actors vote for the same category with overlapping critical
    /// sections, first without the lock and then with it.
    LostUpdate(LostUpdateArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn run(self) -> Result<()> {
        let mut config = TallyConfig::load(self.global.config.as_deref()).context("failed to load configuration")?;
        config.apply(ConfigOverrides {
            roster: self.global.roster.clone(),
            event_log_capacity: self.global.event_log_capacity,
            ..ConfigOverrides::default()
        });

        let json = self.global.is_json;
        match self.command {
            Commands::Stress(args) => args.run(config, json).await,
            Commands::Vote(args) => args.run(config, json).await,
            Commands::LostUpdate(args) => args.run(config, json).await,
        }
    }
}
