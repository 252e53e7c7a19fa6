//! Error types for the tally core.

use snafu::Snafu;

use crate::types::ActorId;
use crate::types::Category;
use crate::types::RejectReason;

/// Errors from vote requests and lock admission.
///
/// All variants are local and recoverable: the request is dropped, state is
/// untouched, and a `vote-rejected` event records why.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum TallyError {
    /// Actor already committed a vote.
    #[snafu(display("'{actor}' has already voted ({category})"))]
    DuplicateVote {
        /// Actor that tried again.
        actor: ActorId,
        /// Category of the committed vote.
        category: Category,
    },

    /// Actor has a request in flight.
    #[snafu(display("'{actor}' already has a vote in progress"))]
    VoteInProgress {
        /// Actor that tried again.
        actor: ActorId,
    },

    /// Category outside the closed set.
    #[snafu(display("unknown category '{value}' (expected delicious, average or poor)"))]
    InvalidCategory {
        /// Raw input.
        value: String,
    },

    /// Actor identifier failed validation.
    #[snafu(display("invalid actor id '{value}': {reason}"))]
    InvalidActor {
        /// Raw input.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Lock wait queue is at capacity.
    #[snafu(display("too many waiters on the lock: {count} (max: {max})"))]
    TooManyWaiters {
        /// Current queue length.
        count: u32,
        /// Maximum allowed waiters.
        max: u32,
    },

    /// Ledger is at capacity.
    #[snafu(display("too many actors registered: {count} (max: {max})"))]
    TooManyActors {
        /// Current roster size.
        count: u32,
        /// Maximum allowed actors.
        max: u32,
    },

    /// The coordinator went away before handing the lock to a waiter.
    #[snafu(display("lock hand-off to '{actor}' was abandoned"))]
    LockAbandoned {
        /// Waiter that never got the lock.
        actor: ActorId,
    },
}

impl TallyError {
    /// Reason recorded on the `vote-rejected` event.
    pub fn reject_reason(&self) -> RejectReason {
        match self {
            TallyError::DuplicateVote { .. } => RejectReason::Duplicate,
            TallyError::VoteInProgress { .. } => RejectReason::InProgress,
            TallyError::InvalidCategory { .. } => RejectReason::InvalidCategory,
            TallyError::InvalidActor { .. } => RejectReason::InvalidActor,
            TallyError::TooManyWaiters { .. } => RejectReason::QueueFull,
            TallyError::TooManyActors { .. } => RejectReason::RosterFull,
            TallyError::LockAbandoned { .. } => RejectReason::Abandoned,
        }
    }
}
