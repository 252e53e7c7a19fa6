//! Centralized constants for the tally lab.
//!
//! Tiger Style: Constants are fixed and immutable, enforced at compile time.
//! Each constant has explicit bounds to prevent unbounded resource allocation.
//!
//! # Modules
//!
//! - [`coordination`]: Lock queue, roster, and event log bounds
//! - [`simulation`]: Processing delay defaults and the seeded roster
//!
//! # Usage
//!
//! ```
//! use tally_constants::coordination::MAX_LOCK_WAITERS;
//! use tally_constants::prelude::*;
//!
//! assert!(DEFAULT_EVENT_LOG_CAPACITY <= MAX_EVENT_LOG_CAPACITY);
//! assert!(MAX_LOCK_WAITERS > 0);
//! ```

mod assertions;
pub mod coordination;
pub mod simulation;

/// Prelude module for commonly used constants.
pub mod prelude {
    pub use crate::coordination::DEFAULT_EVENT_LOG_CAPACITY;
    pub use crate::coordination::MAX_ACTOR_ID_LEN;
    pub use crate::coordination::MAX_ACTORS;
    pub use crate::coordination::MAX_EVENT_LOG_CAPACITY;
    pub use crate::coordination::MAX_LOCK_WAITERS;
    pub use crate::simulation::DEFAULT_PROCESSING_DELAY_MS;
    pub use crate::simulation::MAX_PROCESSING_DELAY_MS;
}

pub use coordination::DEFAULT_EVENT_LOG_CAPACITY;
pub use coordination::EVENT_BROADCAST_CAPACITY;
pub use coordination::MAX_ACTOR_ID_LEN;
pub use coordination::MAX_ACTORS;
pub use coordination::MAX_EVENT_LOG_CAPACITY;
pub use coordination::MAX_LOCK_WAITERS;
pub use simulation::DEFAULT_PROCESSING_DELAY_MS;
pub use simulation::DEFAULT_ROSTER;
pub use simulation::MAX_PROCESSING_DELAY_MS;
