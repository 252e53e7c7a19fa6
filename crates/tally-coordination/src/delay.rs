//! Injectable processing delay for the critical section.
//!
//! The delay is the window between reading a count and writing it back. It is
//! a real suspension point: other tasks run while one is parked here, which is
//! what lets unprotected executions interleave. Implementations decide how
//! long the window lasts and how it lines up with other executions.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;

use crate::types::ActorId;
use crate::types::Category;

/// Suspension between the read and the write of a vote.
#[async_trait]
pub trait ProcessingDelay: Send + Sync {
    /// Park the calling execution for the processing window.
    async fn pause(&self, actor: &ActorId, category: Category);
}

/// Wall-clock delay via `tokio::time::sleep`.
///
/// Under a paused tokio clock (`start_paused`) every sleeper wakes in
/// registration order, which makes fixed delays deterministic in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    duration: Duration,
}

impl FixedDelay {
    /// Delay of `duration`.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Delay of `ms` milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl ProcessingDelay for FixedDelay {
    async fn pause(&self, _actor: &ActorId, _category: Category) {
        tokio::time::sleep(self.duration).await;
    }
}

/// Give up the scheduler once and continue.
///
/// The shortest possible window that still lets other ready tasks run.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldDelay;

#[async_trait]
impl ProcessingDelay for YieldDelay {
    async fn pause(&self, _actor: &ActorId, _category: Category) {
        tokio::task::yield_now().await;
    }
}

/// Hold every execution in the window until `parties` of them are inside.
///
/// With protection disabled and `parties` executions on the same category,
/// this forces the read, read, write, write interleaving. With protection
/// enabled only one execution can ever be inside, so a rendezvous of more
/// than one party never completes; pair it with an unprotected run only.
#[derive(Debug)]
pub struct RendezvousDelay {
    barrier: Barrier,
}

impl RendezvousDelay {
    /// Rendezvous of `parties` executions. The barrier resets after each group.
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl ProcessingDelay for RendezvousDelay {
    async fn pause(&self, _actor: &ActorId, _category: Category) {
        self.barrier.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;

    use super::*;

    fn actor(id: &str) -> ActorId {
        ActorId::new(id).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_sleeps() {
        let start = tokio::time::Instant::now();
        FixedDelay::from_millis(600).pause(&actor("a"), Category::Poor).await;
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_rendezvous_releases_together() {
        let delay = Arc::new(RendezvousDelay::new(2));
        let arrived = Arc::new(AtomicU32::new(0));

        let first = {
            let delay = Arc::clone(&delay);
            let arrived = Arc::clone(&arrived);
            async move {
                arrived.fetch_add(1, Ordering::SeqCst);
                delay.pause(&actor("a"), Category::Average).await;
                arrived.load(Ordering::SeqCst)
            }
        };
        let second = {
            let delay = Arc::clone(&delay);
            let arrived = Arc::clone(&arrived);
            async move {
                arrived.fetch_add(1, Ordering::SeqCst);
                delay.pause(&actor("b"), Category::Average).await;
                arrived.load(Ordering::SeqCst)
            }
        };
        // Neither leaves the window before both have entered it
        let (a, b) = tokio::join!(first, second);
        assert_eq!((a, b), (2, 2));
    }
}
