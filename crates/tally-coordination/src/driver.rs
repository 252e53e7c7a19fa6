//! Burst of concurrent votes, one per unvoted actor.
//!
//! All requests run on the caller's task through `join_all`, so they are
//! first polled in roster order before any of them resumes. With protection
//! enabled that makes lock arrival order equal roster order.
//!
//! Arrival order, grant order and queue depth come from a recording on the
//! lock coordinator rather than from the event log, which only keeps the most
//! recent events and would lose the start of a large burst.

use futures::future::join_all;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::error::TallyError;
use crate::tally::Tally;
use crate::tally::TallySnapshot;
use crate::types::ActorId;
use crate::types::Category;
use crate::types::RejectReason;

/// How categories are handed out to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryAssignment {
    /// `delicious`, `average`, `poor`, `delicious`, ... in roster order.
    #[default]
    RoundRobin,
    /// Everyone votes for the same category.
    Fixed(Category),
}

impl CategoryAssignment {
    /// Category for the actor at roster position `index`.
    pub fn category_for(&self, index: usize) -> Category {
        match self {
            CategoryAssignment::RoundRobin => Category::round_robin(index),
            CategoryAssignment::Fixed(category) => *category,
        }
    }
}

/// What happened to one actor's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    /// The actor.
    pub actor: ActorId,
    /// Category it voted for.
    pub category: Category,
    /// Count written on success, reject reason otherwise.
    pub result: Result<u64, RejectReason>,
}

/// Result of a stress run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressReport {
    /// Per-actor outcomes in roster order.
    pub outcomes: Vec<VoteOutcome>,
    /// Most actors that were queued on the lock at once.
    pub peak_queue_depth: u32,
    /// Actors in the order they reached the lock.
    pub arrival_order: Vec<ActorId>,
    /// Actors in the order they were granted the lock.
    pub grant_order: Vec<ActorId>,
    /// Whether protection was on when the burst started.
    pub protected: bool,
    /// State once every request finished.
    pub snapshot: TallySnapshot,
}

impl StressReport {
    /// Number of votes that were counted.
    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of requests turned away.
    pub fn rejected(&self) -> usize {
        self.outcomes.len() - self.committed()
    }

    /// Committed votes missing from the counters.
    pub fn lost_updates(&self) -> u64 {
        self.snapshot.lost_updates()
    }

    /// True when the lock was granted in the order requests arrived.
    pub fn is_fifo(&self) -> bool {
        self.grant_order == self.arrival_order
    }
}

/// Issues one vote per unvoted actor, all at once.
#[derive(Debug)]
pub struct SimulationDriver<'a> {
    tally: &'a Tally,
    assignment: CategoryAssignment,
}

impl<'a> SimulationDriver<'a> {
    /// Driver over `tally`.
    pub fn new(tally: &'a Tally, assignment: CategoryAssignment) -> Self {
        Self { tally, assignment }
    }

    /// Vote for every actor in the unvoted roster and wait for all of them.
    pub async fn run(&self) -> StressReport {
        let protected = self.tally.is_protected();
        let roster = self.tally.unvoted();
        info!(actors = roster.len(), protected, "stress run starting");

        let requests = roster.into_iter().enumerate().map(|(index, actor)| {
            let category = self.assignment.category_for(index);
            async move {
                let result = self.tally.vote(&actor, category).await;
                VoteOutcome {
                    actor,
                    category,
                    result: result.map(|receipt| receipt.written).map_err(|err: TallyError| err.reject_reason()),
                }
            }
        });
        let recording = self.tally.lock().record();
        let outcomes = join_all(requests).await;
        let activity = recording.finish();

        let report = StressReport {
            outcomes,
            peak_queue_depth: activity.peak_queue_depth,
            arrival_order: activity.arrival_order,
            grant_order: activity.grant_order,
            protected,
            snapshot: self.tally.snapshot(),
        };
        info!(
            committed = report.committed(),
            rejected = report.rejected(),
            peak_queue_depth = report.peak_queue_depth,
            lost_updates = report.lost_updates(),
            "stress run finished"
        );
        report
    }
}
