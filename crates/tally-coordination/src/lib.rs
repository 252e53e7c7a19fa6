//! Mutual exclusion over a shared vote tally.
//!
//! A [`Tally`] owns a set of per-category counters, a binary semaphore with a
//! FIFO wait queue, a ledger of who has voted, and an append-only event log.
//! Each vote runs a deliberately slow read-modify-write against the counters:
//!
//! - [`VoteLedger`] - at most one committed vote per actor
//! - [`LockCoordinator`] - single permit, FIFO hand-off, RAII [`LockGuard`]
//! - [`CriticalSectionExecutor`] - read, [`ProcessingDelay`], write
//! - [`SimulationDriver`] - one concurrent vote per unvoted actor
//!
//! Protection can be switched off at runtime. Requests that start while it is
//! off skip the lock entirely, so overlapping votes on one category lose
//! updates. The event trace makes that observable.
//!
//! The state-transition rules live in [`verified`] as pure functions; the
//! types above are thin async shells around them.
//!
//! ## Example
//!
//! ```ignore
//! use tally_coordination::{Tally, SimulationDriver, CategoryAssignment};
//!
//! let tally = Tally::builder().roster(["Student_101", "Student_102"]).build()?;
//! tally.cast_vote("Student_101", "delicious").await?;
//!
//! let report = SimulationDriver::new(&tally, CategoryAssignment::RoundRobin).run().await;
//! assert!(report.snapshot.is_consistent());
//! ```

mod counters;
mod delay;
mod driver;
mod error;
mod events;
mod executor;
mod ledger;
mod lock;
mod tally;
mod types;
pub mod verified;

pub use counters::CounterSnapshot;
pub use counters::SharedCounterSet;
pub use delay::FixedDelay;
pub use delay::ProcessingDelay;
pub use delay::RendezvousDelay;
pub use delay::YieldDelay;
pub use driver::CategoryAssignment;
pub use driver::SimulationDriver;
pub use driver::StressReport;
pub use driver::VoteOutcome;
pub use error::TallyError;
pub use events::EventLog;
pub use executor::CriticalSectionExecutor;
pub use ledger::ActorVote;
pub use ledger::PendingVote;
pub use ledger::Registration;
pub use ledger::VoteLedger;
pub use lock::LockActivity;
pub use lock::LockCoordinator;
pub use lock::LockGuard;
pub use lock::LockRecording;
pub use lock::ProtectionMode;
pub use tally::Tally;
pub use tally::TallyBuilder;
pub use tally::TallySnapshot;
pub use tally::VoteReceipt;
pub use types::ActorId;
pub use types::Category;
pub use types::Event;
pub use types::EventKind;
pub use types::RejectReason;
pub use types::VoteStatus;
