//! The coordinator-owned tally: one value holding every piece of shared state.
//!
//! A vote request flows through the ledger (admission), the lock (mutual
//! exclusion), the executor (read, delay, write), back to the ledger
//! (commit), and finally releases the lock. Callers share a `Tally` by
//! reference or `Arc`; there is no global state.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tally_constants::DEFAULT_EVENT_LOG_CAPACITY;
use tally_constants::DEFAULT_PROCESSING_DELAY_MS;
use tally_constants::MAX_ACTORS;
use tally_constants::MAX_LOCK_WAITERS;
use tally_time::SystemTimeProvider;
use tally_time::TimeProvider;
use tokio::sync::broadcast;
use tracing::info;
use tracing::warn;

use crate::counters::CounterSnapshot;
use crate::counters::SharedCounterSet;
use crate::delay::FixedDelay;
use crate::delay::ProcessingDelay;
use crate::error::TallyError;
use crate::events::EventLog;
use crate::executor::CriticalSectionExecutor;
use crate::ledger::ActorVote;
use crate::ledger::Registration;
use crate::ledger::VoteLedger;
use crate::lock::LockCoordinator;
use crate::types::ActorId;
use crate::types::Category;
use crate::types::Event;
use crate::types::EventKind;
use crate::verified;

/// A counted vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// Who voted.
    pub actor: ActorId,
    /// For what.
    pub category: Category,
    /// Count this request wrote back for `category`.
    pub written: u64,
    /// Whether the critical section ran under the lock.
    pub protected: bool,
}

/// Everything an observer may ask about, captured together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySnapshot {
    /// Counter values.
    pub counters: CounterSnapshot,
    /// Current lock holder.
    pub holder: Option<ActorId>,
    /// Queued actors in service order.
    pub waiting: Vec<ActorId>,
    /// Whether new requests take the lock.
    pub protection_enabled: bool,
    /// Per-actor status in roster order.
    pub votes: Vec<ActorVote>,
    /// Number of committed votes.
    pub committed: u64,
}

impl TallySnapshot {
    /// Every committed vote is counted exactly once.
    pub fn is_consistent(&self) -> bool {
        verified::is_tally_consistent(self.counters.total, self.committed)
    }

    /// Committed votes that did not survive in the counters.
    pub fn lost_updates(&self) -> u64 {
        self.committed.saturating_sub(self.counters.total)
    }
}

/// Builder for [`Tally`].
pub struct TallyBuilder {
    delay: Arc<dyn ProcessingDelay>,
    protection_enabled: bool,
    clock: Arc<dyn TimeProvider>,
    event_log_capacity: u32,
    max_waiters: u32,
    max_actors: u32,
    roster: Vec<String>,
}

impl Default for TallyBuilder {
    fn default() -> Self {
        Self {
            delay: Arc::new(FixedDelay::from_millis(DEFAULT_PROCESSING_DELAY_MS)),
            protection_enabled: true,
            clock: Arc::new(SystemTimeProvider),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            max_waiters: MAX_LOCK_WAITERS,
            max_actors: MAX_ACTORS,
            roster: Vec::new(),
        }
    }
}

impl TallyBuilder {
    /// Processing delay used by the critical section.
    pub fn delay(mut self, delay: Arc<dyn ProcessingDelay>) -> Self {
        self.delay = delay;
        self
    }

    /// Fixed wall-clock processing delay.
    pub fn processing_delay(self, duration: Duration) -> Self {
        self.delay(Arc::new(FixedDelay::new(duration)))
    }

    /// Initial protection mode.
    pub fn protection(mut self, enabled: bool) -> Self {
        self.protection_enabled = enabled;
        self
    }

    /// Clock used to stamp events.
    pub fn clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of events retained for queries.
    pub fn event_log_capacity(mut self, capacity: u32) -> Self {
        self.event_log_capacity = capacity;
        self
    }

    /// Lock queue capacity.
    pub fn max_waiters(mut self, max_waiters: u32) -> Self {
        self.max_waiters = max_waiters;
        self
    }

    /// Ledger capacity.
    pub fn max_actors(mut self, max_actors: u32) -> Self {
        self.max_actors = max_actors;
        self
    }

    /// Actors registered at startup, in join order (the last one ends up first).
    pub fn roster<I, S>(mut self, actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roster = actors.into_iter().map(Into::into).collect();
        self
    }

    /// Build the tally, registering the roster.
    pub fn build(self) -> Result<Tally, TallyError> {
        let events = Arc::new(EventLog::new(self.event_log_capacity, self.clock));
        let counters = Arc::new(SharedCounterSet::new());
        let tally = Tally {
            lock: LockCoordinator::with_max_waiters(Arc::clone(&events), self.protection_enabled, self.max_waiters),
            executor: CriticalSectionExecutor::new(Arc::clone(&counters), self.delay, Arc::clone(&events)),
            ledger: VoteLedger::with_max_actors(self.max_actors),
            counters,
            events,
        };
        for id in &self.roster {
            tally.register(id)?;
        }
        Ok(tally)
    }
}

/// Shared tally guarded by a FIFO mutex.
pub struct Tally {
    counters: Arc<SharedCounterSet>,
    lock: LockCoordinator,
    executor: CriticalSectionExecutor,
    ledger: VoteLedger,
    events: Arc<EventLog>,
}

impl Tally {
    /// Start configuring a tally.
    pub fn builder() -> TallyBuilder {
        TallyBuilder::default()
    }

    /// Register (or re-register) an actor.
    pub fn register(&self, id: &str) -> Result<ActorId, TallyError> {
        let actor = ActorId::new(id)?;
        match self.ledger.register(&actor)? {
            Registration::New => info!(actor = %actor, "actor joined"),
            Registration::Rejoined => info!(actor = %actor, "actor rejoined"),
        }
        self.events.emit(EventKind::ActorRegistered, Some(&actor), None);
        Ok(actor)
    }

    /// Cast a vote from raw collaborator input.
    ///
    /// Both inputs are validated before the ledger or the lock is touched.
    /// Every failure is also recorded as a `vote-rejected` event.
    pub async fn cast_vote(&self, actor: &str, category: &str) -> Result<VoteReceipt, TallyError> {
        let actor = match ActorId::new(actor) {
            Ok(actor) => actor,
            Err(err) => return Err(self.reject(None, None, err)),
        };
        let category = match category.parse::<Category>() {
            Ok(category) => category,
            Err(err) => return Err(self.reject(Some(&actor), None, err)),
        };
        self.vote(&actor, category).await
    }

    /// Cast a vote.
    pub async fn vote(&self, actor: &ActorId, category: Category) -> Result<VoteReceipt, TallyError> {
        let pending = match self.ledger.begin(actor) {
            Ok(pending) => pending,
            Err(err) => return Err(self.reject(Some(actor), Some(category), err)),
        };
        if pending.joined() {
            info!(actor = %actor, "actor joined on first vote");
            self.events.emit(EventKind::ActorRegistered, Some(actor), None);
        }
        let guard = match self.lock.acquire(actor).await {
            Ok(guard) => guard,
            Err(err) => return Err(self.reject(Some(actor), Some(category), err)),
        };

        let written = self.executor.execute(&guard, category).await;
        pending.commit(category);
        self.events.emit(EventKind::VoteCommitted, Some(actor), Some(category));
        info!(actor = %actor, %category, written, protected = guard.is_protected(), "vote recorded");

        let protected = guard.is_protected();
        guard.release();
        Ok(VoteReceipt {
            actor: actor.clone(),
            category,
            written,
            protected,
        })
    }

    fn reject(&self, actor: Option<&ActorId>, category: Option<Category>, err: TallyError) -> TallyError {
        let reason = err.reject_reason();
        warn!(actor = ?actor.map(ActorId::as_str), %reason, error = %err, "vote rejected");
        self.events.emit(EventKind::VoteRejected { reason }, actor, category);
        err
    }

    /// Switch protection for requests that start from now on.
    pub fn set_protection(&self, enabled: bool) {
        let previous = self.lock.protection().set(enabled);
        if previous != enabled {
            info!(enabled, "protection changed");
            self.events.emit(EventKind::ProtectionChanged { enabled }, None, None);
        }
    }

    /// Whether new requests take the lock.
    pub fn is_protected(&self) -> bool {
        self.lock.protection().is_enabled()
    }

    /// True once `actor` has a committed vote.
    pub fn has_voted(&self, actor: &ActorId) -> bool {
        self.ledger.has_voted(actor)
    }

    /// Actors that have not voted yet, in roster order.
    pub fn unvoted(&self) -> Vec<ActorId> {
        self.ledger.unvoted()
    }

    /// Current counter values.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Current lock holder.
    pub fn holder(&self) -> Option<ActorId> {
        self.lock.holder()
    }

    /// Queued actors in service order.
    pub fn waiting(&self) -> Vec<ActorId> {
        self.lock.waiting()
    }

    /// Per-actor status in roster order.
    pub fn votes(&self) -> Vec<ActorVote> {
        self.ledger.statuses()
    }

    /// Everything at once.
    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            counters: self.counters.snapshot(),
            holder: self.lock.holder(),
            waiting: self.lock.waiting(),
            protection_enabled: self.is_protected(),
            votes: self.ledger.statuses(),
            committed: self.ledger.committed_count(),
        }
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.events()
    }

    /// Retained events after `seq`.
    pub fn events_since(&self, seq: u64) -> Vec<Event> {
        self.events.events_since(seq)
    }

    /// Sequence number of the newest event.
    pub fn last_event_seq(&self) -> u64 {
        self.events.last_seq()
    }

    /// Live event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The lock coordinator.
    pub fn lock(&self) -> &LockCoordinator {
        &self.lock
    }

    /// The vote ledger.
    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }
}

impl std::fmt::Debug for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tally")
            .field("counters", &self.counters)
            .field("lock", &self.lock)
            .field("ledger", &self.ledger)
            .field("events", &self.events)
            .finish()
    }
}
