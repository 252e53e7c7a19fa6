//! Sequential votes.

use anyhow::Context;
use anyhow::Result;
use anyhow::ensure;
use clap::Args;
use tally::TallyConfig;
use tracing::debug;

use crate::output::SnapshotOutput;
use crate::output::print_event;
use crate::output::print_output;

#[derive(Args)]
pub struct VoteArgs {
    /// Voting actor. Repeat together with --category.
    #[arg(long = "actor", required = true)]
    pub actors: Vec<String>,

    /// Category for the matching --actor.
    #[arg(long = "category", required = true)]
    pub categories: Vec<String>,
}

impl VoteArgs {
    pub async fn run(self, config: TallyConfig, json: bool) -> Result<()> {
        ensure!(
            self.actors.len() == self.categories.len(),
            "got {} --actor and {} --category values, they must pair up",
            self.actors.len(),
            self.categories.len()
        );
        config.validate().context("invalid configuration")?;

        let tally = config.tally_builder().build().context("failed to build tally")?;
        let mut seen = tally.last_event_seq();
        for event in tally.events() {
            print_event(&event, json);
        }

        let mut rejected = 0u32;
        for (actor, category) in self.actors.iter().zip(&self.categories) {
            if let Err(err) = tally.cast_vote(actor, category).await {
                rejected += 1;
                debug!(error = %err, "vote not counted");
            }
            for event in tally.events_since(seen) {
                print_event(&event, json);
            }
            seen = tally.last_event_seq();
        }

        if !json {
            println!("\n{} of {} votes rejected\n", rejected, self.actors.len());
        }
        print_output(&SnapshotOutput(&tally.snapshot()), json);
        Ok(())
    }
}
