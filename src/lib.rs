//! Tally lab: a FIFO-locked shared vote tally and what goes wrong without it.
//!
//! The core lives in the workspace crates; this package carries layered
//! configuration and the `tally-lab` binary.
//!
//! - [`tally_coordination`]: lock, ledger, critical section, events, driver
//! - [`tally_constants`]: fixed limits and defaults
//! - [`tally_time`]: event clocks

pub mod config;

pub use config::ConfigError;
pub use config::ConfigOverrides;
pub use config::TallyConfig;
pub use tally_constants as constants;
pub use tally_coordination as coordination;
pub use tally_time as time;
