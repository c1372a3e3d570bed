//! Cache Entry Module
//!
//! Defines a single stored object and its last-touch timestamp.

use std::time::{Duration, Instant};

// == Entry ==
/// Represents a single object held by the store.
///
/// The key is not stored here; it is derived from `object` when needed.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    /// The stored object
    pub object: T,
    /// Time of the last insert or touch
    pub timestamp: Instant,
}

impl<T> Entry<T> {
    // == Constructor ==
    /// Creates a new entry touched at `now`.
    pub fn new(object: T, now: Instant) -> Self {
        Self {
            object,
            timestamp: now,
        }
    }

    // == Touch ==
    /// Refreshes the entry's timestamp to `now`.
    pub fn touch(&mut self, now: Instant) {
        self.timestamp = now;
    }

    // == Replace ==
    /// Overwrites the object in place and refreshes the timestamp.
    pub fn replace(&mut self, object: T, now: Instant) {
        self.object = object;
        self.timestamp = now;
    }

    // == Age ==
    /// Time elapsed since the last touch, saturating at zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    // == Is Expired ==
    /// Checks if the entry has been idle for at least `ttl`.
    ///
    /// Boundary condition: an entry whose age equals the TTL exactly is
    /// expired.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) >= ttl
    }
}
