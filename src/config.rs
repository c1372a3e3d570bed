//! Configuration Module
//!
//! Holds the construction-time parameters of an eviction store.

use std::time::Duration;

use tracing::warn;

use crate::error::{Result, StoreError};

/// Default TTL used by [`StoreConfig::default`].
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Store configuration parameters.
///
/// The TTL is fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Idle time after which an entry becomes eligible for eviction
    pub ttl: Duration,
}

impl StoreConfig {
    /// Creates a config with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Returns a copy of this config with a different TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Checks the config before a store is built from it.
    ///
    /// # Errors
    /// - `StoreError::InvalidTtl` if the TTL is zero
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            warn!("Rejecting store config with zero TTL");
            return Err(StoreError::InvalidTtl(self.ttl));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}
