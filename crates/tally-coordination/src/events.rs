//! Append-only event log with live fan-out.
//!
//! The log is the core's only outward channel besides queries. Events are
//! numbered and stamped under one lock so `seq` order is emission order. A
//! bounded window is kept for snapshot queries; every event is also sent on a
//! broadcast channel for live subscribers.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tally_constants::EVENT_BROADCAST_CAPACITY;
use tally_time::TimeProvider;
use tokio::sync::broadcast;

use crate::types::ActorId;
use crate::types::Category;
use crate::types::Event;
use crate::types::EventKind;

struct EventLogInner {
    next_seq: u64,
    events: VecDeque<Event>,
}

/// Ordered, append-only record of everything the core did.
pub struct EventLog {
    inner: Mutex<EventLogInner>,
    capacity: usize,
    clock: Arc<dyn TimeProvider>,
    sender: broadcast::Sender<Event>,
}

impl EventLog {
    /// Create a log retaining the most recent `capacity` events (at least 1).
    pub fn new(capacity: u32, clock: Arc<dyn TimeProvider>) -> Self {
        let (sender, _) = broadcast::channel(EVENT_BROADCAST_CAPACITY as usize);
        let capacity = capacity.max(1) as usize;
        Self {
            inner: Mutex::new(EventLogInner {
                next_seq: 1,
                events: VecDeque::with_capacity(capacity.min(1024)),
            }),
            capacity,
            clock,
            sender,
        }
    }

    /// Append an event and publish it to subscribers.
    pub fn emit(&self, kind: EventKind, actor: Option<&ActorId>, category: Option<Category>) -> Event {
        let mut inner = self.inner.lock();
        let event = Event {
            seq: inner.next_seq,
            kind,
            actor: actor.cloned(),
            category,
            timestamp_ms: self.clock.now_unix_ms(),
        };
        inner.next_seq = inner.next_seq.saturating_add(1);
        if inner.events.len() >= self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event.clone());
        // Sent under the lock so subscribers observe seq order; no receivers is fine
        let _ = self.sender.send(event.clone());
        event
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.iter().cloned().collect()
    }

    /// Retained events with `seq` greater than `after`.
    pub fn events_since(&self, after: u64) -> Vec<Event> {
        self.inner.lock().events.iter().filter(|e| e.seq > after).cloned().collect()
    }

    /// Sequence number of the newest event (0 if none yet).
    pub fn last_seq(&self) -> u64 {
        self.inner.lock().next_seq.saturating_sub(1)
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// True if nothing has been retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live stream of events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("capacity", &self.capacity).field("last_seq", &self.last_seq()).finish()
    }
}
