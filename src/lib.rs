//! Evict Store - An in-memory, time-bounded object store
//!
//! Holds the most recently touched objects and forgets entries that have
//! been idle longer than a configured TTL. Eviction is lazy: it runs as a
//! side effect of inserts and lookups rather than on a timer.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use evict_store::{EvictionStore, FakeClock};
//!
//! let clock = Arc::new(FakeClock::new());
//! let store = EvictionStore::new(|s: &String| s.clone(), Duration::from_secs(600), clock.clone())
//!     .expect("non-zero ttl");
//!
//! store.insert("request-42".to_string());
//! assert!(store.lookup("request-42").is_some());
//!
//! clock.advance(Duration::from_secs(601));
//! assert!(store.lookup("request-42").is_none());
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;

pub use cache::{EvictionStore, StoreStats};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
