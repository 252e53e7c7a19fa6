//! Concurrent burst over the whole roster.

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use tally::ConfigOverrides;
use tally::TallyConfig;
use tally::coordination::Category;
use tally::coordination::CategoryAssignment;
use tally::coordination::SimulationDriver;

use crate::output::StressOutput;
use crate::output::print_output;
use crate::output::stream_events;

#[derive(Args)]
pub struct StressArgs {
    /// Run without the mutex.
    #[arg(long)]
    pub unprotected: bool,

    /// Processing delay between read and write, in milliseconds.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,

    /// Everyone votes for this category instead of round-robin.
    #[arg(long)]
    pub category: Option<Category>,
}

impl StressArgs {
    pub async fn run(self, mut config: TallyConfig, json: bool) -> Result<()> {
        config.apply(ConfigOverrides {
            processing_delay_ms: self.delay_ms,
            protection_enabled: self.unprotected.then_some(false),
            ..ConfigOverrides::default()
        });
        config.validate().context("invalid configuration")?;

        let tally = config.tally_builder().build().context("failed to build tally")?;
        let printer = tokio::spawn(stream_events(tally.subscribe(), json));

        let assignment = self.category.map(CategoryAssignment::Fixed).unwrap_or_default();
        let report = SimulationDriver::new(&tally, assignment).run().await;

        drop(tally);
        printer.await.context("activity stream task failed")?;

        println!();
        print_output(&StressOutput(&report), json);
        Ok(())
    }
}
