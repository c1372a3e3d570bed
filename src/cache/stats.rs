//! Store Statistics Module
//!
//! Tracks lookup outcomes, writes, and eviction sweep activity.

use serde::Serialize;

// == Store Stats ==
/// Counters describing how a store has been used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Lookups that returned an object
    pub hits: u64,
    /// Lookups that found nothing (never inserted, evicted, or stale)
    pub misses: u64,
    /// Inserts that created a new entry
    pub inserts: u64,
    /// Inserts that replaced an existing entry in place
    pub updates: u64,
    /// Entries removed because their TTL elapsed
    pub evictions: u64,
    /// Eviction sweeps that actually ran (not skipped by the rate limit)
    pub sweeps: u64,
    /// Current number of entries held, including stale ones not yet swept
    pub total_entries: usize,
}

impl StoreStats {
    // == Constructor ==
    /// Creates a new StoreStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the lookup hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Insert ==
    /// Increments the counter of newly created entries.
    pub fn record_insert(&mut self) {
        self.inserts += 1;
    }

    // == Record Update ==
    /// Increments the counter of in-place replacements.
    pub fn record_update(&mut self) {
        self.updates += 1;
    }

    // == Record Sweep ==
    /// Adds the outcome of one sweep.
    pub fn record_sweep(&mut self, evicted: usize) {
        self.sweeps += 1;
        self.evictions += evicted as u64;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
