//! Binary semaphore with a FIFO wait queue and direct hand-off.
//!
//! The coordinator owns the permit (0 or 1), the current holder, and an
//! ordered queue of blocked requests. Each queued request parks on its own
//! `oneshot` channel; release pops the head of the queue, makes it the holder,
//! and signals it, all under the same state lock. The permit never becomes
//! available in between, so later arrivals cannot overtake a waiter.
//!
//! Protection can be switched off at runtime. A request samples the mode once
//! when it calls [`LockCoordinator::acquire`]; the returned [`LockGuard`]
//! remembers the sample so that its release matches its acquire even if the
//! mode flips while the request is inside the critical section.
//!
//! [`LockCoordinator::record`] opens a window in which the coordinator keeps
//! its own account of arrivals, grants and queue depth. Unlike the event log
//! that account is not capped, so it stays exact for bursts of any size.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tally_constants::MAX_LOCK_WAITERS;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;

use crate::error::TallyError;
use crate::events::EventLog;
use crate::types::ActorId;
use crate::types::EventKind;
use crate::verified;
use crate::verified::AcquireDecision;
use crate::verified::ReleaseDecision;

/// Process-wide switch between serialized and unserialized execution.
#[derive(Debug)]
pub struct ProtectionMode {
    enabled: AtomicBool,
}

impl ProtectionMode {
    /// Create with the given initial mode.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Whether requests starting now take the lock.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Set the mode, returning the previous one.
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }
}

impl Default for ProtectionMode {
    fn default() -> Self {
        Self::new(true)
    }
}

struct Waiter {
    actor: ActorId,
    wake: oneshot::Sender<()>,
}

/// What the lock saw while a [`LockRecording`] was open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockActivity {
    /// Actors in the order they reached the lock, granted at once or queued.
    pub arrival_order: Vec<ActorId>,
    /// Actors in the order they were granted the lock.
    pub grant_order: Vec<ActorId>,
    /// Most requests queued at once.
    pub peak_queue_depth: u32,
}

struct Recording {
    id: u64,
    activity: LockActivity,
}

struct LockState {
    permit: u8,
    holder: Option<ActorId>,
    waiters: VecDeque<Waiter>,
    recording: Option<Recording>,
    next_recording_id: u64,
}

impl LockState {
    fn note_arrival(&mut self, actor: &ActorId) {
        let depth = self.waiters.len() as u32;
        if let Some(recording) = self.recording.as_mut() {
            recording.activity.arrival_order.push(actor.clone());
            recording.activity.peak_queue_depth = recording.activity.peak_queue_depth.max(depth);
        }
    }

    fn note_grant(&mut self, actor: &ActorId) {
        if let Some(recording) = self.recording.as_mut() {
            recording.activity.grant_order.push(actor.clone());
        }
    }
}

/// Owner of admission to the critical section.
pub struct LockCoordinator {
    state: Mutex<LockState>,
    protection: ProtectionMode,
    events: Arc<EventLog>,
    max_waiters: u32,
}

impl LockCoordinator {
    /// Create an unlocked coordinator.
    pub fn new(events: Arc<EventLog>, protection_enabled: bool) -> Self {
        Self::with_max_waiters(events, protection_enabled, MAX_LOCK_WAITERS)
    }

    /// Create an unlocked coordinator with a custom queue capacity.
    pub fn with_max_waiters(events: Arc<EventLog>, protection_enabled: bool, max_waiters: u32) -> Self {
        Self {
            state: Mutex::new(LockState {
                permit: 1,
                holder: None,
                waiters: VecDeque::new(),
                recording: None,
                next_recording_id: 0,
            }),
            protection: ProtectionMode::new(protection_enabled),
            events,
            max_waiters,
        }
    }

    /// The runtime protection switch.
    pub fn protection(&self) -> &ProtectionMode {
        &self.protection
    }

    /// Enter the critical section.
    ///
    /// With protection disabled this returns at once with an unprotected
    /// guard. Otherwise the caller either takes the free permit or joins the
    /// tail of the queue and suspends until the lock is handed to it.
    pub async fn acquire(&self, actor: &ActorId) -> Result<LockGuard<'_>, TallyError> {
        if !self.protection.is_enabled() {
            debug!(actor = %actor, "protection disabled, entering critical section unlocked");
            return Ok(LockGuard::new(self, actor.clone(), false));
        }

        let wake = {
            let mut state = self.state.lock();
            let queue_len = state.waiters.len() as u32;
            match verified::decide_acquire(state.permit, queue_len, self.max_waiters) {
                AcquireDecision::Grant => {
                    state.permit = verified::permit_after_grant(state.permit);
                    state.holder = Some(actor.clone());
                    state.note_arrival(actor);
                    state.note_grant(actor);
                    self.events.emit(EventKind::LockAcquired, Some(actor), None);
                    debug!(actor = %actor, "lock acquired");
                    return Ok(LockGuard::new(self, actor.clone(), true));
                }
                AcquireDecision::QueueFull => {
                    warn!(actor = %actor, queue_len, max = self.max_waiters, "lock queue full");
                    return Err(TallyError::TooManyWaiters {
                        count: queue_len,
                        max: self.max_waiters,
                    });
                }
                AcquireDecision::Enqueue => {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push_back(Waiter {
                        actor: actor.clone(),
                        wake: tx,
                    });
                    state.note_arrival(actor);
                    self.events.emit(EventKind::LockBlocked, Some(actor), None);
                    debug!(actor = %actor, position = queue_len + 1, "lock busy, queued");
                    rx
                }
            }
        };

        let mut pending = PendingHandOff {
            coordinator: self,
            actor: actor.clone(),
            wake: Some(wake),
        };
        pending.wait().await?;
        // The releaser already made us the holder before signalling
        Ok(LockGuard::new(self, actor.clone(), true))
    }

    /// Give up the lock held by `actor`.
    ///
    /// Hands the permit to the head of the queue if anyone is waiting,
    /// otherwise frees it. Waiters whose requests were dropped are skipped.
    fn release(&self, actor: &ActorId) {
        let mut state = self.state.lock();
        let decision = verified::decide_release(state.permit, state.waiters.len() as u32);
        if decision == ReleaseDecision::NotHeld {
            warn!(actor = %actor, "release of a lock that is not held ignored");
            return;
        }
        if state.holder.as_ref() != Some(actor) {
            warn!(actor = %actor, holder = ?state.holder, "release by non-holder ignored");
            return;
        }
        self.events.emit(EventKind::LockReleased, Some(actor), None);

        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.wake.send(()).is_ok() {
                debug!(from = %actor, to = %waiter.actor, remaining = state.waiters.len(), "lock handed off");
                self.events.emit(EventKind::LockAcquired, Some(&waiter.actor), None);
                state.note_grant(&waiter.actor);
                state.holder = Some(waiter.actor);
                return;
            }
            debug!(actor = %waiter.actor, "skipping abandoned waiter");
        }

        state.permit = verified::permit_after_release(state.permit, ReleaseDecision::FreePermit);
        state.holder = None;
        debug!(actor = %actor, "lock released, permit free");
    }

    /// Current holder, if the lock is taken.
    pub fn holder(&self) -> Option<ActorId> {
        self.state.lock().holder.clone()
    }

    /// Queued actors in the order they will be served.
    ///
    /// Requests dropped while queued are left out, even before the queue has
    /// been pruned.
    pub fn waiting(&self) -> Vec<ActorId> {
        self.state.lock().waiters.iter().filter(|w| !w.wake.is_closed()).map(|w| w.actor.clone()).collect()
    }

    /// Number of live queued requests, counted the same way as [`Self::waiting`].
    pub fn queue_len(&self) -> u32 {
        self.state.lock().waiters.iter().filter(|w| !w.wake.is_closed()).count() as u32
    }

    /// Start recording arrivals, grants and queue depth.
    ///
    /// Only one recording is active at a time; starting a new one ends the
    /// previous one, whose [`LockRecording::finish`] then returns nothing.
    pub fn record(&self) -> LockRecording<'_> {
        let mut state = self.state.lock();
        let id = state.next_recording_id;
        state.next_recording_id = id.wrapping_add(1);
        let activity = LockActivity {
            peak_queue_depth: state.waiters.len() as u32,
            ..LockActivity::default()
        };
        state.recording = Some(Recording { id, activity });
        LockRecording {
            coordinator: self,
            id,
            finished: false,
        }
    }

    /// Available permits (0 or 1).
    pub fn permits(&self) -> u8 {
        self.state.lock().permit
    }

    /// True while some actor holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.lock().holder.is_some()
    }
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LockCoordinator")
            .field("permit", &state.permit)
            .field("holder", &state.holder)
            .field("waiters", &state.waiters.len())
            .field("protection", &self.protection.is_enabled())
            .finish()
    }
}

/// An open recording window on a [`LockCoordinator`].
///
/// Dropping it without calling [`LockRecording::finish`] discards what was
/// recorded.
#[must_use = "the recording stops as soon as it is dropped"]
pub struct LockRecording<'a> {
    coordinator: &'a LockCoordinator,
    id: u64,
    finished: bool,
}

impl LockRecording<'_> {
    /// Stop recording and return what was seen.
    pub fn finish(mut self) -> LockActivity {
        self.finished = true;
        self.take().unwrap_or_default()
    }

    fn take(&self) -> Option<LockActivity> {
        let mut state = self.coordinator.state.lock();
        match state.recording.as_ref() {
            Some(recording) if recording.id == self.id => state.recording.take().map(|r| r.activity),
            _ => None,
        }
    }
}

impl Drop for LockRecording<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.take();
        }
    }
}

impl std::fmt::Debug for LockRecording<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRecording").field("id", &self.id).finish()
    }
}

/// A queued request that has not yet been handed the lock.
///
/// If the request is dropped while parked, it is removed from the queue; if
/// the hand-off raced with the drop, the lock is passed on instead of leaking.
struct PendingHandOff<'a> {
    coordinator: &'a LockCoordinator,
    actor: ActorId,
    wake: Option<oneshot::Receiver<()>>,
}

impl PendingHandOff<'_> {
    async fn wait(&mut self) -> Result<(), TallyError> {
        let Some(wake) = self.wake.as_mut() else {
            return Ok(());
        };
        let result = wake.await;
        self.wake = None;
        result.map_err(|_| TallyError::LockAbandoned {
            actor: self.actor.clone(),
        })
    }
}

impl Drop for PendingHandOff<'_> {
    fn drop(&mut self) {
        let Some(mut wake) = self.wake.take() else {
            return;
        };
        wake.close();
        if wake.try_recv().is_ok() {
            debug!(actor = %self.actor, "hand-off arrived after request was dropped, passing lock on");
            self.coordinator.release(&self.actor);
        } else {
            self.coordinator.state.lock().waiters.retain(|w| !w.wake.is_closed());
        }
    }
}

/// Proof of admission to the critical section.
///
/// Dropping the guard (or calling [`LockGuard::release`]) releases the lock
/// exactly once. An unprotected guard releases nothing.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    coordinator: &'a LockCoordinator,
    actor: ActorId,
    protected: bool,
    released: bool,
}

impl<'a> LockGuard<'a> {
    fn new(coordinator: &'a LockCoordinator, actor: ActorId, protected: bool) -> Self {
        Self {
            coordinator,
            actor,
            protected,
            released: false,
        }
    }

    /// Actor that owns this admission.
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Whether this admission actually holds the lock.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Release now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.protected {
            self.coordinator.release(&self.actor);
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("actor", &self.actor).field("protected", &self.protected).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;
    use tally_time::SimulatedTimeProvider;

    use super::*;

    fn coordinator(enabled: bool) -> LockCoordinator {
        let events = Arc::new(EventLog::new(256, Arc::new(SimulatedTimeProvider::new(0))));
        LockCoordinator::new(events, enabled)
    }

    fn actor(id: &str) -> ActorId {
        ActorId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_uncontended_acquire_release() {
        let lock = coordinator(true);
        let a = actor("a");
        let guard = lock.acquire(&a).await.unwrap();
        assert!(guard.is_protected());
        assert_eq!(lock.permits(), 0);
        assert_eq!(lock.holder(), Some(a.clone()));
        guard.release();
        assert_eq!(lock.permits(), 1);
        assert_eq!(lock.holder(), None);
    }

    #[tokio::test]
    async fn test_disabled_acquire_is_noop() {
        let lock = coordinator(false);
        let first = lock.acquire(&actor("a")).await.unwrap();
        let second = lock.acquire(&actor("b")).await.unwrap();
        assert!(!first.is_protected());
        assert!(!second.is_protected());
        assert_eq!(lock.permits(), 1);
        assert!(lock.holder().is_none());
        drop(first);
        drop(second);
        assert_eq!(lock.permits(), 1);
        assert!(lock.events.is_empty());
    }

    #[tokio::test]
    async fn test_release_hands_off_directly() {
        let lock = coordinator(true);
        let a = actor("a");
        let b = actor("b");
        let guard_a = lock.acquire(&a).await.unwrap();

        let mut waiting_b = Box::pin(lock.acquire(&b));
        assert!(waiting_b.as_mut().now_or_never().is_none());
        assert_eq!(lock.waiting(), vec![b.clone()]);

        guard_a.release();
        // Permit went straight to b, never back to 1
        assert_eq!(lock.permits(), 0);
        assert_eq!(lock.holder(), Some(b.clone()));

        // A newcomer cannot barge in ahead of b
        let c = actor("c");
        let mut barging = Box::pin(lock.acquire(&c));
        assert!(barging.as_mut().now_or_never().is_none());

        let guard_b = waiting_b.await.unwrap();
        assert_eq!(guard_b.actor(), &b);
        drop(guard_b);
        assert_eq!(lock.holder(), Some(c.clone()));
    }

    #[tokio::test]
    async fn test_waiters_served_in_arrival_order() {
        let lock = coordinator(true);
        let holder = lock.acquire(&actor("h")).await.unwrap();

        let mut parked: Vec<_> = ["w1", "w2", "w3"].into_iter().map(|id| Box::pin(lock.acquire_owned_id(id))).collect();
        for fut in parked.iter_mut() {
            assert!(fut.as_mut().now_or_never().is_none());
        }
        assert_eq!(lock.queue_len(), 3);

        holder.release();
        let mut served = Vec::new();
        for fut in parked {
            let guard = fut.await.unwrap();
            served.push(guard.actor().to_string());
        }
        assert_eq!(served, vec!["w1", "w2", "w3"]);
        assert_eq!(lock.permits(), 1);
        assert_eq!(lock.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_queue_capacity_enforced() {
        let events = Arc::new(EventLog::new(64, Arc::new(SimulatedTimeProvider::new(0))));
        let lock = LockCoordinator::with_max_waiters(events, true, 1);
        let _holder = lock.acquire(&actor("h")).await.unwrap();
        let w1 = actor("w1");
        let mut first = Box::pin(lock.acquire(&w1));
        assert!(first.as_mut().now_or_never().is_none());

        let err = lock.acquire(&actor("w2")).await.unwrap_err();
        assert_eq!(err, TallyError::TooManyWaiters { count: 1, max: 1 });
        assert_eq!(lock.queue_len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_skipped() {
        let lock = coordinator(true);
        let holder = lock.acquire(&actor("h")).await.unwrap();

        let gone = tokio::time::timeout(Duration::from_millis(10), lock.acquire(&actor("gone"))).await;
        assert!(gone.is_err());
        assert!(lock.waiting().is_empty());

        let next_id = actor("next");
        let mut next = Box::pin(lock.acquire(&next_id));
        assert!(next.as_mut().now_or_never().is_none());
        holder.release();
        let guard = next.await.unwrap();
        assert_eq!(guard.actor().as_str(), "next");
    }

    #[tokio::test]
    async fn test_hand_off_to_dropped_request_passes_lock_on() {
        let lock = coordinator(true);
        let holder = lock.acquire(&actor("h")).await.unwrap();
        let (doomed_id, next_id) = (actor("doomed"), actor("next"));
        let mut doomed = Box::pin(lock.acquire(&doomed_id));
        assert!(doomed.as_mut().now_or_never().is_none());
        let mut next = Box::pin(lock.acquire(&next_id));
        assert!(next.as_mut().now_or_never().is_none());

        // Hand-off reaches "doomed", which is dropped before it observes it
        holder.release();
        assert_eq!(lock.holder(), Some(actor("doomed")));
        drop(doomed);

        assert_eq!(lock.holder(), Some(actor("next")));
        let guard = next.await.unwrap();
        drop(guard);
        assert_eq!(lock.permits(), 1);
    }

    #[tokio::test]
    async fn test_mode_flip_keeps_release_balanced() {
        let lock = coordinator(true);
        let guard = lock.acquire(&actor("a")).await.unwrap();
        lock.protection().set(false);
        let unprotected = lock.acquire(&actor("b")).await.unwrap();
        assert!(!unprotected.is_protected());
        drop(unprotected);
        assert_eq!(lock.holder(), Some(actor("a")));
        drop(guard);
        assert_eq!(lock.permits(), 1);
    }

    #[tokio::test]
    async fn test_lock_events() {
        let lock = coordinator(true);
        let guard = lock.acquire(&actor("a")).await.unwrap();
        let b_id = actor("b");
        let mut b = Box::pin(lock.acquire(&b_id));
        assert!(b.as_mut().now_or_never().is_none());
        drop(guard);
        drop(b.await.unwrap());

        let kinds: Vec<(&str, String)> = lock
            .events
            .events()
            .iter()
            .map(|e| (e.kind.as_str(), e.actor.as_ref().unwrap().to_string()))
            .collect();
        assert_eq!(kinds, vec![
            ("lock-acquired", "a".to_string()),
            ("lock-blocked", "b".to_string()),
            ("lock-released", "a".to_string()),
            ("lock-acquired", "b".to_string()),
            ("lock-released", "b".to_string()),
        ]);
    }

    #[tokio::test]
    async fn test_dropped_waiter_leaves_both_queue_views() {
        let lock = coordinator(true);
        let _holder = lock.acquire(&actor("h")).await.unwrap();
        let (kept_id, gone_id) = (actor("kept"), actor("gone"));
        let mut kept = Box::pin(lock.acquire(&kept_id));
        assert!(kept.as_mut().now_or_never().is_none());
        let mut gone = Box::pin(lock.acquire(&gone_id));
        assert!(gone.as_mut().now_or_never().is_none());
        assert_eq!(lock.queue_len(), 2);

        drop(gone);
        assert_eq!(lock.waiting(), vec![kept_id.clone()]);
        assert_eq!(lock.queue_len(), lock.waiting().len() as u32);
    }

    #[tokio::test]
    async fn test_recording_tracks_arrivals_grants_and_depth() {
        let lock = coordinator(true);
        let recording = lock.record();
        let holder = lock.acquire(&actor("h")).await.unwrap();
        let (w1, w2) = (actor("w1"), actor("w2"));
        let mut first = Box::pin(lock.acquire(&w1));
        assert!(first.as_mut().now_or_never().is_none());
        let mut second = Box::pin(lock.acquire(&w2));
        assert!(second.as_mut().now_or_never().is_none());

        holder.release();
        drop(first.await.unwrap());
        drop(second.await.unwrap());

        let activity = recording.finish();
        let names = |actors: &[ActorId]| actors.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        assert_eq!(names(&activity.arrival_order), vec!["h", "w1", "w2"]);
        assert_eq!(names(&activity.grant_order), vec!["h", "w1", "w2"]);
        assert_eq!(activity.peak_queue_depth, 2);
    }

    #[tokio::test]
    async fn test_newer_recording_replaces_older() {
        let lock = coordinator(true);
        let old = lock.record();
        let new = lock.record();
        drop(lock.acquire(&actor("a")).await.unwrap());

        assert_eq!(old.finish(), LockActivity::default());
        assert_eq!(new.finish().grant_order, vec![actor("a")]);

        // Nothing is recorded once the window is closed
        drop(lock.acquire(&actor("b")).await.unwrap());
        assert_eq!(lock.record().finish(), LockActivity::default());
    }

    impl LockCoordinator {
        async fn acquire_owned_id(&self, id: &str) -> Result<LockGuard<'_>, TallyError> {
            let actor = ActorId::new(id)?;
            self.acquire(&actor).await
        }
    }
}
