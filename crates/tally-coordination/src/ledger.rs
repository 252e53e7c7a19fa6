//! Per-actor vote state and the roster.
//!
//! The ledger guarantees at most one committed vote per actor. Admission
//! moves an actor to `Pending` before it goes anywhere near the lock, so a
//! second request for the same actor is turned away immediately instead of
//! queueing behind the first.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use tally_constants::MAX_ACTORS;
use tracing::debug;

use crate::error::TallyError;
use crate::types::ActorId;
use crate::types::Category;
use crate::types::VoteStatus;
use crate::verified;
use crate::verified::Admission;

/// An actor and where it is in the voting lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorVote {
    /// The actor.
    pub actor: ActorId,
    /// Its status.
    pub status: VoteStatus,
}

/// Result of registering an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time the ledger has seen this actor.
    New,
    /// Already known; moved to the front of the roster.
    Rejoined,
}

#[derive(Default)]
struct LedgerState {
    /// Most recently joined first.
    roster: Vec<ActorId>,
    statuses: HashMap<ActorId, VoteStatus>,
}

impl LedgerState {
    fn insert_front(&mut self, actor: &ActorId) -> Registration {
        if let Some(pos) = self.roster.iter().position(|a| a == actor) {
            let existing = self.roster.remove(pos);
            self.roster.insert(0, existing);
            Registration::Rejoined
        } else {
            self.roster.insert(0, actor.clone());
            self.statuses.insert(actor.clone(), VoteStatus::Unvoted);
            Registration::New
        }
    }

    fn check_capacity(&self, actor: &ActorId, max_actors: u32) -> Result<(), TallyError> {
        let count = self.roster.len() as u32;
        if !self.statuses.contains_key(actor) && count >= max_actors {
            return Err(TallyError::TooManyActors { count, max: max_actors });
        }
        Ok(())
    }
}

/// Tracks which actors have voted.
pub struct VoteLedger {
    state: Mutex<LedgerState>,
    max_actors: u32,
}

impl Default for VoteLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl VoteLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::with_max_actors(MAX_ACTORS)
    }

    /// Empty ledger with a custom actor limit.
    pub fn with_max_actors(max_actors: u32) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            max_actors,
        }
    }

    /// Add an actor (or move a known one to the front of the roster).
    ///
    /// Re-registration never resets a vote.
    pub fn register(&self, actor: &ActorId) -> Result<Registration, TallyError> {
        let mut state = self.state.lock();
        state.check_capacity(actor, self.max_actors)?;
        Ok(state.insert_front(actor))
    }

    /// Admit a vote request, moving the actor to `Pending`.
    ///
    /// Unknown actors are registered on the way in. The returned handle must
    /// be committed once the critical section finishes; dropping it instead
    /// puts the actor back to `Unvoted`.
    pub fn begin(&self, actor: &ActorId) -> Result<PendingVote<'_>, TallyError> {
        let mut state = self.state.lock();
        let current = state.statuses.get(actor).copied();
        match verified::decide_admission(current.as_ref()) {
            Admission::AlreadyCommitted(category) => {
                return Err(TallyError::DuplicateVote {
                    actor: actor.clone(),
                    category,
                });
            }
            Admission::InProgress => {
                return Err(TallyError::VoteInProgress { actor: actor.clone() });
            }
            Admission::Admit => {}
        }
        let joined = current.is_none();
        if joined {
            state.check_capacity(actor, self.max_actors)?;
            state.insert_front(actor);
        }
        state.statuses.insert(actor.clone(), VoteStatus::Pending);
        debug!(actor = %actor, "vote pending");
        Ok(PendingVote {
            ledger: self,
            actor: actor.clone(),
            joined,
            done: false,
        })
    }

    /// True once `actor` has a committed vote.
    pub fn has_voted(&self, actor: &ActorId) -> bool {
        self.status(actor).is_some_and(|s| s.is_committed())
    }

    /// Status of one actor, `None` if never registered.
    pub fn status(&self, actor: &ActorId) -> Option<VoteStatus> {
        self.state.lock().statuses.get(actor).copied()
    }

    /// Every actor with its status, in roster order.
    pub fn statuses(&self) -> Vec<ActorVote> {
        let state = self.state.lock();
        state
            .roster
            .iter()
            .map(|actor| ActorVote {
                actor: actor.clone(),
                status: state.statuses.get(actor).copied().unwrap_or(VoteStatus::Unvoted),
            })
            .collect()
    }

    /// Actors that have not voted yet, in roster order.
    pub fn unvoted(&self) -> Vec<ActorId> {
        let state = self.state.lock();
        state
            .roster
            .iter()
            .filter(|actor| matches!(state.statuses.get(*actor), Some(VoteStatus::Unvoted)))
            .cloned()
            .collect()
    }

    /// The roster, most recently joined first.
    pub fn roster(&self) -> Vec<ActorId> {
        self.state.lock().roster.clone()
    }

    /// Number of committed votes.
    pub fn committed_count(&self) -> u64 {
        self.state.lock().statuses.values().filter(|s| s.is_committed()).count() as u64
    }

    fn finish(&self, actor: &ActorId, to: VoteStatus) {
        let mut state = self.state.lock();
        if let Some(status) = state.statuses.get_mut(actor)
            && verified::is_valid_vote_transition(status, &to)
        {
            *status = to;
        }
    }
}

impl std::fmt::Debug for VoteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VoteLedger").field("actors", &state.roster.len()).field("max_actors", &self.max_actors).finish()
    }
}

/// An admitted vote that has not been counted yet.
#[must_use = "dropping a pending vote rolls the actor back to unvoted"]
pub struct PendingVote<'a> {
    ledger: &'a VoteLedger,
    actor: ActorId,
    joined: bool,
    done: bool,
}

impl PendingVote<'_> {
    /// Actor this vote belongs to.
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// True when this request was the actor's first contact with the ledger.
    pub fn joined(&self) -> bool {
        self.joined
    }

    /// Mark the vote counted.
    pub fn commit(mut self, category: Category) {
        self.done = true;
        self.ledger.finish(&self.actor, VoteStatus::Committed(category));
    }
}

impl Drop for PendingVote<'_> {
    fn drop(&mut self) {
        if !self.done {
            debug!(actor = %self.actor, "pending vote abandoned, rolling back");
            self.ledger.finish(&self.actor, VoteStatus::Unvoted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: &str) -> ActorId {
        ActorId::new(id).unwrap()
    }

    #[test]
    fn test_register_prepends_and_rejoin_moves_to_front() {
        let ledger = VoteLedger::new();
        assert_eq!(ledger.register(&actor("a")).unwrap(), Registration::New);
        assert_eq!(ledger.register(&actor("b")).unwrap(), Registration::New);
        assert_eq!(ledger.register(&actor("a")).unwrap(), Registration::Rejoined);
        let roster: Vec<String> = ledger.roster().iter().map(|a| a.to_string()).collect();
        assert_eq!(roster, vec!["a", "b"]);
    }

    #[test]
    fn test_vote_lifecycle() {
        let ledger = VoteLedger::new();
        let a = actor("a");
        ledger.register(&a).unwrap();
        assert_eq!(ledger.status(&a), Some(VoteStatus::Unvoted));

        let pending = ledger.begin(&a).unwrap();
        assert!(!pending.joined());
        assert_eq!(ledger.status(&a), Some(VoteStatus::Pending));
        assert!(ledger.unvoted().is_empty());
        assert!(!ledger.has_voted(&a));

        pending.commit(Category::Poor);
        assert_eq!(ledger.status(&a), Some(VoteStatus::Committed(Category::Poor)));
        assert!(ledger.has_voted(&a));
        assert_eq!(ledger.committed_count(), 1);
    }

    #[test]
    fn test_duplicate_vote_rejected_without_change() {
        let ledger = VoteLedger::new();
        let a = actor("a");
        ledger.begin(&a).unwrap().commit(Category::Delicious);

        let err = ledger.begin(&a).err().unwrap();
        assert_eq!(err, TallyError::DuplicateVote {
            actor: a.clone(),
            category: Category::Delicious,
        });
        assert_eq!(ledger.status(&a), Some(VoteStatus::Committed(Category::Delicious)));
        assert_eq!(ledger.committed_count(), 1);
    }

    #[test]
    fn test_concurrent_request_for_same_actor_rejected() {
        let ledger = VoteLedger::new();
        let a = actor("a");
        let _first = ledger.begin(&a).unwrap();
        let err = ledger.begin(&a).err().unwrap();
        assert_eq!(err, TallyError::VoteInProgress { actor: a });
    }

    #[test]
    fn test_abandoned_vote_rolls_back() {
        let ledger = VoteLedger::new();
        let a = actor("a");
        drop(ledger.begin(&a).unwrap());
        assert_eq!(ledger.status(&a), Some(VoteStatus::Unvoted));
        assert_eq!(ledger.unvoted(), vec![a.clone()]);
        // And can vote again afterwards
        ledger.begin(&a).unwrap().commit(Category::Average);
        assert!(ledger.unvoted().is_empty());
    }

    #[test]
    fn test_unknown_actor_registered_on_vote() {
        let ledger = VoteLedger::new();
        ledger.register(&actor("a")).unwrap();
        let pending = ledger.begin(&actor("z")).unwrap();
        assert!(pending.joined());
        pending.commit(Category::Poor);
        let statuses = ledger.statuses();
        assert_eq!(statuses[0].actor.as_str(), "z");
        assert_eq!(statuses[0].status, VoteStatus::Committed(Category::Poor));
        assert_eq!(statuses[1].status, VoteStatus::Unvoted);
    }

    #[test]
    fn test_actor_limit() {
        let ledger = VoteLedger::with_max_actors(1);
        ledger.register(&actor("a")).unwrap();
        assert_eq!(ledger.register(&actor("b")).unwrap_err(), TallyError::TooManyActors { count: 1, max: 1 });
        // Known actors can still rejoin and vote
        assert_eq!(ledger.register(&actor("a")).unwrap(), Registration::Rejoined);
        assert!(ledger.begin(&actor("b")).is_err());
        assert!(ledger.begin(&actor("a")).is_ok());
    }
}
