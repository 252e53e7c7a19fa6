//! Command implementations.

pub mod lost_update;
pub mod stress;
pub mod vote;
