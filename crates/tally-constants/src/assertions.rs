//! Compile-time constant assertions for Tiger Style compliance.
//!
//! These assertions catch configuration errors at compile time rather than runtime.

use super::coordination::*;
use super::simulation::*;

// ============================================================================
// Lock and Ledger Bounds
// ============================================================================

const _: () = assert!(MAX_LOCK_WAITERS > 0);
// Every registered actor can be queued at once during a stress burst
const _: () = assert!(MAX_LOCK_WAITERS >= MAX_ACTORS);
const _: () = assert!(MAX_ACTOR_ID_LEN > 0);
const _: () = assert!(DEFAULT_ROSTER.len() as u32 <= MAX_ACTORS);

// ============================================================================
// Event Log Bounds
// ============================================================================

const _: () = assert!(DEFAULT_EVENT_LOG_CAPACITY > 0);
const _: () = assert!(DEFAULT_EVENT_LOG_CAPACITY <= MAX_EVENT_LOG_CAPACITY);
const _: () = assert!(EVENT_BROADCAST_CAPACITY > 0);

// ============================================================================
// Processing Delay
// ============================================================================

const _: () = assert!(DEFAULT_PROCESSING_DELAY_MS <= MAX_PROCESSING_DELAY_MS);
