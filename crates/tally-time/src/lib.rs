//! Clock sources for stamping tally events.
//!
//! Every event the coordinator emits carries a Unix millisecond timestamp.
//! The clock is injected through [`TimeProvider`] so tests can pin or step
//! time instead of reading the wall clock.
//!
//! # Tiger Style
//!
//! - No `.expect()` or `.unwrap()` - safe fallback to 0
//! - Saturating arithmetic on simulated clocks

#[cfg(feature = "simulation")]
use std::sync::Arc;
#[cfg(feature = "simulation")]
use std::sync::atomic::AtomicU64;
#[cfg(feature = "simulation")]
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Get current Unix timestamp in milliseconds.
///
/// Returns 0 if system time is before UNIX epoch.
#[inline]
pub fn current_time_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Source of event timestamps.
///
/// # Example
///
/// ```
/// use tally_time::{SystemTimeProvider, TimeProvider};
///
/// fn stamp<T: TimeProvider + ?Sized>(clock: &T) -> u64 {
///     clock.now_unix_ms()
/// }
///
/// assert!(stamp(&SystemTimeProvider) > 0);
/// ```
pub trait TimeProvider: Send + Sync {
    /// Current Unix timestamp in milliseconds.
    fn now_unix_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> u64 {
        current_time_ms()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Reads return the stored value plus an optional per-read step, so a test can
/// either freeze time or have every stamped event land one tick later than
/// the previous one.
///
/// ```ignore
/// use tally_time::{SimulatedTimeProvider, TimeProvider};
///
/// let clock = SimulatedTimeProvider::new(1_000);
/// assert_eq!(clock.now_unix_ms(), 1_000);
/// clock.advance_ms(250);
/// assert_eq!(clock.now_unix_ms(), 1_250);
///
/// let ticking = SimulatedTimeProvider::ticking(0, 10);
/// assert_eq!(ticking.now_unix_ms(), 0);
/// assert_eq!(ticking.now_unix_ms(), 10);
/// ```
#[cfg(feature = "simulation")]
#[derive(Debug, Clone)]
pub struct SimulatedTimeProvider {
    current_time_ms: Arc<AtomicU64>,
    step_ms: u64,
}

#[cfg(feature = "simulation")]
impl SimulatedTimeProvider {
    /// Frozen clock at `initial_time_ms`.
    pub fn new(initial_time_ms: u64) -> Self {
        Self::ticking(initial_time_ms, 0)
    }

    /// Clock that advances by `step_ms` after every read.
    pub fn ticking(initial_time_ms: u64, step_ms: u64) -> Self {
        Self {
            current_time_ms: Arc::new(AtomicU64::new(initial_time_ms)),
            step_ms,
        }
    }

    /// Advance time by the given number of milliseconds.
    pub fn advance_ms(&self, delta_ms: u64) {
        // fetch_update never fails with a closure that always returns Some
        let _ = self
            .current_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(delta_ms)));
    }

    /// Set the current time.
    pub fn set_ms(&self, time_ms: u64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }
}

#[cfg(feature = "simulation")]
impl Default for SimulatedTimeProvider {
    fn default() -> Self {
        Self::new(current_time_ms())
    }
}

#[cfg(feature = "simulation")]
impl TimeProvider for SimulatedTimeProvider {
    fn now_unix_ms(&self) -> u64 {
        if self.step_ms == 0 {
            return self.current_time_ms.load(Ordering::SeqCst);
        }
        let step = self.step_ms;
        // Returns the value before the step, so the first read sees the initial time
        self.current_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(step)))
            .unwrap_or_else(|t| t)
    }
}


#[cfg(all(test, feature = "simulation"))]
mod simulation_tests {
    use super::*;

    #[test]
    fn frozen_clock_does_not_move() {
        let clock = SimulatedTimeProvider::new(5_000);
        assert_eq!(clock.now_unix_ms(), 5_000);
        assert_eq!(clock.now_unix_ms(), 5_000);
    }

    #[test]
    fn advance_and_set() {
        let clock = SimulatedTimeProvider::new(1_000);
        clock.advance_ms(500);
        assert_eq!(clock.now_unix_ms(), 1_500);
        clock.set_ms(10);
        assert_eq!(clock.now_unix_ms(), 10);
    }

    #[test]
    fn advance_saturates() {
        let clock = SimulatedTimeProvider::new(u64::MAX - 1);
        clock.advance_ms(10);
        assert_eq!(clock.now_unix_ms(), u64::MAX);
    }

    #[test]
    fn ticking_clock_steps_after_each_read() {
        let clock = SimulatedTimeProvider::ticking(100, 5);
        assert_eq!(clock.now_unix_ms(), 100);
        assert_eq!(clock.now_unix_ms(), 105);
        assert_eq!(clock.now_unix_ms(), 110);
    }

    #[test]
    fn clones_share_time() {
        let a = SimulatedTimeProvider::new(0);
        let b = a.clone();
        a.advance_ms(42);
        assert_eq!(b.now_unix_ms(), 42);
    }
}
