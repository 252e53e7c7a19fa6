//! Two overlapping votes on one category, without and then with the mutex.

use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::ensure;
use clap::Args;
use tally::ConfigOverrides;
use tally::TallyConfig;
use tally::coordination::Category;
use tally::coordination::CategoryAssignment;
use tally::coordination::RendezvousDelay;
use tally::coordination::SimulationDriver;
use tally::coordination::Tally;

use crate::output::LostUpdateOutput;
use crate::output::print_event;
use crate::output::print_output;

const CONTENDERS: usize = 2;

#[derive(Args)]
pub struct LostUpdateArgs {
    /// Processing delay for the protected run, in milliseconds.
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,

    /// Category both actors vote for.
    #[arg(long, default_value = "average")]
    pub category: Category,
}

impl LostUpdateArgs {
    pub async fn run(self, mut config: TallyConfig, json: bool) -> Result<()> {
        config.apply(ConfigOverrides {
            processing_delay_ms: self.delay_ms,
            ..ConfigOverrides::default()
        });
        config.validate().context("invalid configuration")?;
        ensure!(config.roster.len() >= CONTENDERS, "lost-update needs at least {CONTENDERS} actors on the roster");
        let contenders: Vec<String> = config.roster.iter().take(CONTENDERS).cloned().collect();
        let assignment = CategoryAssignment::Fixed(self.category);

        // Without the lock both critical sections are held in the window together
        let unprotected = Tally::builder()
            .delay(Arc::new(RendezvousDelay::new(CONTENDERS)))
            .protection(false)
            .event_log_capacity(config.event_log_capacity)
            .roster(contenders.iter().cloned())
            .build()
            .context("failed to build unprotected tally")?;
        let off = SimulationDriver::new(&unprotected, assignment).run().await;
        for event in unprotected.events() {
            print_event(&event, json);
        }

        let protected = config
            .tally_builder()
            .protection(true)
            .roster(contenders)
            .build()
            .context("failed to build protected tally")?;
        let on = SimulationDriver::new(&protected, assignment).run().await;
        for event in protected.events() {
            print_event(&event, json);
        }

        println!();
        print_output(
            &LostUpdateOutput {
                category: self.category,
                unprotected: &off,
                protected: &on,
            },
            json,
        );
        Ok(())
    }
}
