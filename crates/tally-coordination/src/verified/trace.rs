//! Pure checks over an ordered event trace.
//!
//! These power the simulation report and the mutual-exclusion assertions: the
//! trace is the only place where interleavings are observable after the fact.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::types::ActorId;
use crate::types::Category;
use crate::types::Event;
use crate::types::EventKind;

/// Two critical sections touched the same category concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessViolation {
    /// Category both sections touched.
    pub category: Category,
    /// Actor whose read was still open.
    pub open_reader: ActorId,
    /// Actor that read inside the open window.
    pub intruder: ActorId,
    /// Sequence number of the intruding read.
    pub seq: u64,
}

/// Highest number of simultaneously blocked actors in the trace.
///
/// An actor counts as blocked from its `lock-blocked` event until its next
/// `lock-acquired` event.
pub fn peak_queue_depth<'a, I>(events: I) -> u32
where I: IntoIterator<Item = &'a Event> {
    let mut blocked: HashSet<&ActorId> = HashSet::new();
    let mut peak: u32 = 0;
    for event in events {
        let Some(actor) = event.actor.as_ref() else {
            continue;
        };
        match event.kind {
            EventKind::LockBlocked => {
                blocked.insert(actor);
                peak = peak.max(blocked.len() as u32);
            }
            EventKind::LockAcquired => {
                blocked.remove(actor);
            }
            _ => {}
        }
    }
    peak
}

/// Actors in the order the lock was granted to them.
pub fn lock_grant_order<'a, I>(events: I) -> Vec<ActorId>
where I: IntoIterator<Item = &'a Event> {
    events
        .into_iter()
        .filter(|e| e.kind == EventKind::LockAcquired)
        .filter_map(|e| e.actor.clone())
        .collect()
}

/// Find the first read of a category that happened between another actor's
/// read and write of the same category.
///
/// Returns `None` when every read/write pair in the trace is uninterrupted,
/// which is what a serialized critical section guarantees.
pub fn find_overlapping_access<'a, I>(events: I) -> Option<AccessViolation>
where I: IntoIterator<Item = &'a Event> {
    let mut open: HashMap<Category, &ActorId> = HashMap::new();
    for event in events {
        let (Some(actor), Some(category)) = (event.actor.as_ref(), event.category) else {
            continue;
        };
        match event.kind {
            EventKind::CounterRead { .. } => {
                if let Some(reader) = open.get(&category) {
                    return Some(AccessViolation {
                        category,
                        open_reader: (*reader).clone(),
                        intruder: actor.clone(),
                        seq: event.seq,
                    });
                }
                open.insert(category, actor);
            }
            EventKind::CounterWritten { .. } => {
                if open.get(&category).is_some_and(|reader| *reader == actor) {
                    open.remove(&category);
                }
            }
            _ => {}
        }
    }
    None
}
