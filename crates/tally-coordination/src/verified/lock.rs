//! Pure binary-semaphore decisions.
//!
//! The lock is a permit count in {0, 1} plus a FIFO of waiters. Release never
//! returns the permit to 1 while someone is queued: the permit is handed
//! straight to the head of the queue, so a newcomer cannot barge in between
//! the release and the waiter resuming.
//!
//! # Tiger Style
//!
//! - Permit is a `u8` restricted to {0, 1}
//! - Queue length and limit are `u32`

/// Outcome of an acquire attempt against the current lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireDecision {
    /// The permit is free: take it and enter immediately.
    Grant,
    /// The permit is taken: append to the tail of the wait queue.
    Enqueue,
    /// The wait queue is full.
    QueueFull,
}

/// Outcome of a release by the current holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseDecision {
    /// Pop the head of the queue and make it the holder. Permit stays 0.
    HandOff,
    /// Nobody is waiting: return the permit.
    FreePermit,
    /// The permit is already free; releasing again would mint a second permit.
    NotHeld,
}

/// Check that a permit count is a valid binary semaphore value.
#[inline]
pub fn is_valid_permit(permit: u8) -> bool {
    permit <= 1
}

/// Decide what an acquire does.
///
/// # Arguments
///
/// * `permit` - Current permit count (0 or 1)
/// * `queue_len` - Number of queued waiters
/// * `max_waiters` - Queue capacity
///
/// A free permit is only granted directly when nobody is queued. A permit of 1
/// with a non-empty queue cannot occur (hand-off keeps it at 0), but if it
/// did the newcomer still queues behind the existing waiters.
#[inline]
pub fn decide_acquire(permit: u8, queue_len: u32, max_waiters: u32) -> AcquireDecision {
    if permit >= 1 && queue_len == 0 {
        AcquireDecision::Grant
    } else if queue_len >= max_waiters {
        AcquireDecision::QueueFull
    } else {
        AcquireDecision::Enqueue
    }
}

/// Decide what a release does.
#[inline]
pub fn decide_release(permit: u8, queue_len: u32) -> ReleaseDecision {
    if permit >= 1 {
        ReleaseDecision::NotHeld
    } else if queue_len > 0 {
        ReleaseDecision::HandOff
    } else {
        ReleaseDecision::FreePermit
    }
}

/// Permit count after a direct grant.
#[inline]
pub fn permit_after_grant(permit: u8) -> u8 {
    permit.saturating_sub(1)
}

/// Permit count after a release with the given decision.
#[inline]
pub fn permit_after_release(permit: u8, decision: ReleaseDecision) -> u8 {
    match decision {
        ReleaseDecision::HandOff => permit,
        ReleaseDecision::FreePermit => 1,
        ReleaseDecision::NotHeld => permit.min(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_permit_is_granted() {
        assert_eq!(decide_acquire(1, 0, 8), AcquireDecision::Grant);
        assert_eq!(permit_after_grant(1), 0);
    }

    #[test]
    fn test_held_permit_enqueues() {
        assert_eq!(decide_acquire(0, 0, 8), AcquireDecision::Enqueue);
        assert_eq!(decide_acquire(0, 7, 8), AcquireDecision::Enqueue);
    }

    #[test]
    fn test_full_queue_rejects() {
        assert_eq!(decide_acquire(0, 8, 8), AcquireDecision::QueueFull);
        assert_eq!(decide_acquire(0, 0, 0), AcquireDecision::QueueFull);
    }

    #[test]
    fn test_no_barging_past_waiters() {
        // Even with a stray free permit, a newcomer must not overtake the queue
        assert_eq!(decide_acquire(1, 3, 8), AcquireDecision::Enqueue);
    }

    #[test]
    fn test_release_hands_off_without_freeing() {
        let decision = decide_release(0, 2);
        assert_eq!(decision, ReleaseDecision::HandOff);
        assert_eq!(permit_after_release(0, decision), 0);
    }

    #[test]
    fn test_release_with_empty_queue_frees_permit() {
        let decision = decide_release(0, 0);
        assert_eq!(decision, ReleaseDecision::FreePermit);
        assert_eq!(permit_after_release(0, decision), 1);
    }

    #[test]
    fn test_double_release_never_mints_permit() {
        let decision = decide_release(1, 0);
        assert_eq!(decision, ReleaseDecision::NotHeld);
        assert_eq!(permit_after_release(1, decision), 1);
        assert!(is_valid_permit(permit_after_release(1, decision)));
    }

    #[test]
    fn test_permit_stays_binary() {
        for permit in 0..=1u8 {
            for queue_len in 0..3u32 {
                let decision = decide_release(permit, queue_len);
                assert!(is_valid_permit(permit_after_release(permit, decision)));
            }
            assert!(is_valid_permit(permit_after_grant(permit)));
        }
    }
}
