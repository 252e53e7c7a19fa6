//! Pure vote-ledger transitions.
//!
//! An actor moves `Unvoted -> Pending -> Committed`. `Pending` falls back to
//! `Unvoted` when a request is abandoned before its critical section commits.
//! Nothing ever leaves `Committed`.

use crate::types::Category;
use crate::types::VoteStatus;

/// Whether a new vote request may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Unknown or unvoted actor: move to `Pending`.
    Admit,
    /// Actor already committed a vote for this category.
    AlreadyCommitted(Category),
    /// Another request for this actor is in flight.
    InProgress,
}

/// Decide admission from the actor's current status (`None` = unknown actor).
#[inline]
pub fn decide_admission(status: Option<&VoteStatus>) -> Admission {
    match status {
        None | Some(VoteStatus::Unvoted) => Admission::Admit,
        Some(VoteStatus::Pending) => Admission::InProgress,
        Some(VoteStatus::Committed(category)) => Admission::AlreadyCommitted(*category),
    }
}

/// Check that a vote state transition is allowed.
#[inline]
pub fn is_valid_vote_transition(from: &VoteStatus, to: &VoteStatus) -> bool {
    matches!(
        (from, to),
        (VoteStatus::Unvoted, VoteStatus::Pending)
            | (VoteStatus::Pending, VoteStatus::Committed(_))
            | (VoteStatus::Pending, VoteStatus::Unvoted)
    )
}
