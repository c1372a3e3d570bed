//! Error types for the eviction store
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for the eviction store.
///
/// Lookup misses are not errors; they surface as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// TTL must be strictly positive
    #[error("Invalid TTL: {0:?} (must be greater than zero)")]
    InvalidTtl(Duration),
}

// == Result Type Alias ==
/// Convenience Result type for the eviction store.
pub type Result<T> = std::result::Result<T, StoreError>;
