//! The critical section: read, suspend, write back.

use std::sync::Arc;

use tracing::debug;

use crate::counters::SharedCounterSet;
use crate::delay::ProcessingDelay;
use crate::events::EventLog;
use crate::lock::LockGuard;
use crate::types::Category;
use crate::types::EventKind;
use crate::verified;

/// Runs the timed read-modify-write against the shared counters.
///
/// The read and the write are separate steps with a suspension between them.
/// That gap is the race window; only the lock keeps two executions out of it
/// at the same time.
pub struct CriticalSectionExecutor {
    counters: Arc<SharedCounterSet>,
    delay: Arc<dyn ProcessingDelay>,
    events: Arc<EventLog>,
}

impl CriticalSectionExecutor {
    /// Create an executor over `counters`.
    pub fn new(counters: Arc<SharedCounterSet>, delay: Arc<dyn ProcessingDelay>, events: Arc<EventLog>) -> Self {
        Self { counters, delay, events }
    }

    /// Increment `category` on behalf of the guard's actor.
    ///
    /// Requires a [`LockGuard`] as proof of admission; an unprotected guard
    /// admits unconditionally. Returns the value written.
    pub async fn execute(&self, guard: &LockGuard<'_>, category: Category) -> u64 {
        let actor = guard.actor();

        let captured = self.counters.read(category);
        self.events.emit(EventKind::CounterRead { value: captured }, Some(actor), Some(category));
        debug!(actor = %actor, %category, captured, protected = guard.is_protected(), "read count");

        self.delay.pause(actor, category).await;

        let value = verified::apply_increment(captured);
        self.counters.write(category, value);
        self.events.emit(EventKind::CounterWritten { value }, Some(actor), Some(category));
        debug!(actor = %actor, %category, value, "wrote count");
        value
    }
}

impl std::fmt::Debug for CriticalSectionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriticalSectionExecutor").field("counters", &self.counters).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tally_time::SimulatedTimeProvider;

    use super::*;
    use crate::delay::RendezvousDelay;
    use crate::delay::YieldDelay;
    use crate::lock::LockCoordinator;
    use crate::types::ActorId;

    struct Harness {
        counters: Arc<SharedCounterSet>,
        lock: LockCoordinator,
        executor: CriticalSectionExecutor,
    }

    fn harness(enabled: bool, delay: Arc<dyn ProcessingDelay>) -> Harness {
        let events = Arc::new(EventLog::new(256, Arc::new(SimulatedTimeProvider::new(0))));
        let counters = Arc::new(SharedCounterSet::new());
        Harness {
            counters: Arc::clone(&counters),
            lock: LockCoordinator::new(Arc::clone(&events), enabled),
            executor: CriticalSectionExecutor::new(counters, delay, events),
        }
    }

    async fn run(h: &Harness, id: &str, category: Category) -> u64 {
        let actor = ActorId::new(id).unwrap();
        let guard = h.lock.acquire(&actor).await.unwrap();
        let value = h.executor.execute(&guard, category).await;
        guard.release();
        value
    }

    #[tokio::test]
    async fn test_single_execution_increments() {
        let h = harness(true, Arc::new(YieldDelay));
        assert_eq!(run(&h, "a", Category::Delicious).await, 1);
        assert_eq!(h.counters.read(Category::Delicious), 1);
    }

    #[tokio::test]
    async fn test_unprotected_overlap_loses_update() {
        let h = harness(false, Arc::new(RendezvousDelay::new(2)));
        let (a, b) = tokio::join!(run(&h, "a", Category::Average), run(&h, "b", Category::Average));
        // Both read 0 before either wrote
        assert_eq!((a, b), (1, 1));
        assert_eq!(h.counters.read(Category::Average), 1);
    }

    #[tokio::test]
    async fn test_protected_overlap_serializes() {
        let h = harness(true, Arc::new(YieldDelay));
        let (a, b) = tokio::join!(run(&h, "a", Category::Average), run(&h, "b", Category::Average));
        assert_eq!((a, b), (1, 2));
        assert_eq!(h.counters.read(Category::Average), 2);
    }
}
