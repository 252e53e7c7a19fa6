//! Defaults for the simulated critical section and the seeded roster.

/// Default processing delay between the read and the write of a vote (600 ms).
///
/// Long enough, relative to how quickly a stress burst is issued, that
/// unprotected executions reliably overlap inside the window.
pub const DEFAULT_PROCESSING_DELAY_MS: u64 = 600;

/// Maximum configurable processing delay (60 s).
pub const MAX_PROCESSING_DELAY_MS: u64 = 60_000;

/// Actors present before anyone joins.
pub const DEFAULT_ROSTER: [&str; 3] = ["Student_101", "Student_102", "Student_103"];
