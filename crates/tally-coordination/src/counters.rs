//! The shared, mutable tally.
//!
//! Reads and writes are deliberately separate operations: the executor reads,
//! suspends, then writes. Each call is individually atomic; nothing here makes
//! the pair atomic. That is the lock's job.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;

use crate::types::Category;
use crate::verified;

/// Category -> count, shared by every critical section.
#[derive(Debug, Default)]
pub struct SharedCounterSet {
    counts: Mutex<[u64; Category::COUNT]>,
}

impl SharedCounterSet {
    /// All counts start at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for one category.
    pub fn read(&self, category: Category) -> u64 {
        self.counts.lock()[category.index()]
    }

    /// Overwrite the count for one category.
    pub fn write(&self, category: Category, value: u64) {
        self.counts.lock()[category.index()] = value;
    }

    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        verified::sum_counts(*self.counts.lock())
    }

    /// Consistent copy of every count.
    pub fn snapshot(&self) -> CounterSnapshot {
        let counts = *self.counts.lock();
        CounterSnapshot::from_counts(counts)
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Count per category.
    pub counts: BTreeMap<Category, u64>,
    /// Sum of all counts.
    pub total: u64,
}

impl CounterSnapshot {
    fn from_counts(counts: [u64; Category::COUNT]) -> Self {
        Self {
            counts: Category::ALL.iter().map(|c| (*c, counts[c.index()])).collect(),
            total: verified::sum_counts(counts),
        }
    }

    /// Count for one category.
    pub fn get(&self, category: Category) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Rounded percentage of all votes that went to `category`.
    pub fn share_percent(&self, category: Category) -> u32 {
        verified::share_percent(self.get(category), self.total)
    }
}
