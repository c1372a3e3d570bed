//! Cache Module
//!
//! Provides the in-memory eviction store with recency ordering and lazy TTL
//! eviction.

mod entry;
mod order;
mod stats;
mod store;


// Re-export public types
pub(crate) use entry::Entry;
pub use stats::StoreStats;
pub use store::EvictionStore;
