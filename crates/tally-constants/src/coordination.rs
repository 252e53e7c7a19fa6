//! Bounds for the lock coordinator, vote ledger, and event log.
//!
//! Tiger Style: every in-memory collection the core owns has a fixed ceiling.

/// Maximum number of requests that may be queued behind the lock holder.
///
/// Tiger Style: Fixed limit prevents an unbounded wait queue. An `acquire`
/// beyond this depth is rejected without touching lock state.
pub const MAX_LOCK_WAITERS: u32 = 4096;

/// Maximum number of actors the vote ledger tracks.
pub const MAX_ACTORS: u32 = 4096;

/// Maximum length of an actor identifier in bytes.
pub const MAX_ACTOR_ID_LEN: u32 = 128;

/// Number of events retained for snapshot queries by default.
pub const DEFAULT_EVENT_LOG_CAPACITY: u32 = 1024;

/// Upper bound on the configurable event log capacity.
pub const MAX_EVENT_LOG_CAPACITY: u32 = 65_536;

/// Buffer size of the live event broadcast channel.
///
/// Slow subscribers lag (and are told so by tokio) rather than blocking the core.
pub const EVENT_BROADCAST_CAPACITY: u32 = 256;
