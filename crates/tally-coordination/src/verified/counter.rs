//! Pure counter arithmetic.
//!
//! # Tiger Style
//!
//! - Saturating arithmetic (no overflow panics)
//! - Percentages as rounded integers, no floats

/// Value written back by a critical section that read `captured`.
#[inline]
pub fn apply_increment(captured: u64) -> u64 {
    captured.saturating_add(1)
}

/// Sum of all category counts.
#[inline]
pub fn sum_counts<I>(counts: I) -> u64
where I: IntoIterator<Item = u64> {
    counts.into_iter().fold(0u64, |acc, c| acc.saturating_add(c))
}

/// Share of `count` in `total`, rounded to the nearest whole percent.
///
/// Returns 0 when `total` is 0.
#[inline]
pub fn share_percent(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = count.saturating_mul(100).saturating_add(total / 2) / total;
    scaled.min(100) as u32
}

/// The tally is consistent when every committed vote is reflected exactly once.
#[inline]
pub fn is_tally_consistent(total_count: u64, committed_votes: u64) -> bool {
    total_count == committed_votes
}
