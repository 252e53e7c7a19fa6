//! Verified pure functions for the tally coordination core.
//!
//! This module holds the deterministic decision logic of the lock, the vote
//! ledger, and the counters. All functions are:
//!
//! - **Deterministic**: No I/O, no clocks, no locking
//! - **Total**: Saturating/checked arithmetic, no panics
//!
//! # Architecture
//!
//! "Functional Core, Imperative Shell": the async shells in [`crate::lock`],
//! [`crate::ledger`] and [`crate::executor`] read their state under a short
//! synchronous lock, ask a function here what to do, and apply the answer.
//!
//! # Module Organization
//!
//! - [`lock`]: Permit accounting, acquire/release decisions
//! - [`ledger`]: Vote admission and state transitions
//! - [`counter`]: Increment, totals, shares, the sum invariant
//! - [`trace`]: Queue depth and mutual-exclusion checks over an event trace
//!
//! # Tiger Style
//!
//! - Explicit types (u64, u32, not usize)
//! - Fixed limits passed in as parameters

pub mod counter;
pub mod ledger;
pub mod lock;
pub mod trace;

// ============================================================================
// Re-exports: Lock
// ============================================================================

pub use lock::AcquireDecision;
pub use lock::ReleaseDecision;
pub use lock::decide_acquire;
pub use lock::decide_release;
pub use lock::is_valid_permit;
pub use lock::permit_after_grant;
pub use lock::permit_after_release;

// ============================================================================
// Re-exports: Ledger
// ============================================================================

pub use ledger::Admission;
pub use ledger::decide_admission;
pub use ledger::is_valid_vote_transition;

// ============================================================================
// Re-exports: Counter
// ============================================================================

pub use counter::apply_increment;
pub use counter::is_tally_consistent;
pub use counter::share_percent;
pub use counter::sum_counts;

// ============================================================================
// Re-exports: Trace
// ============================================================================

pub use trace::AccessViolation;
pub use trace::find_overlapping_access;
pub use trace::lock_grant_order;
pub use trace::peak_queue_depth;
