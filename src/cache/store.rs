//! Eviction Store Module
//!
//! Main store combining a key index with a recency list and lazy TTL eviction.
//!
//! Every public operation takes the store lock, reads the clock once, does
//! its work, and runs an eviction sweep before releasing the lock. Sweeps are
//! rate limited to one per TTL window and walk the recency list from the
//! oldest end, so the total eviction work is bounded by the number of
//! inserts.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::order::{NodeId, RecencyList};
use crate::cache::{Entry, StoreStats};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::Result;

/// Derives the index key of a stored object.
type KeyFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// State guarded by the store lock.
struct Inner<T> {
    /// Key to recency-list handle
    index: HashMap<String, NodeId>,
    /// Entries ordered newest (front) to oldest (back)
    order: RecencyList<Entry<T>>,
    /// Time of the most recent sweep that ran
    last_sweep: Option<Instant>,
    stats: StoreStats,
}

impl<T> Inner<T> {
    /// Returns the handle indexed under `key` if it still resolves to a node.
    ///
    /// An index entry whose node was already evicted (only possible with an
    /// unstable key function) is dropped and reported as absent.
    fn live_handle(&mut self, key: &str) -> Option<NodeId> {
        let id = *self.index.get(key)?;
        if self.order.contains(id) {
            return Some(id);
        }
        self.index.remove(key);
        trace!(key = %key, "Dropped index entry for an evicted node");
        None
    }
}

// == Eviction Store ==
/// Thread-safe object store that forgets entries idle for longer than a TTL.
///
/// Objects are indexed by a string derived with the key function supplied at
/// construction. The key function must be a pure, stable function of the
/// object: two objects that should share an entry must map to the same key,
/// and the key of a stored object must not change while it is held.
///
/// Both [`insert`](Self::insert) and [`lookup`](Self::lookup) refresh an
/// entry, so an entry survives as long as it keeps being touched.
pub struct EvictionStore<T, C = SystemClock> {
    inner: Mutex<Inner<T>>,
    key_fn: KeyFn<T>,
    ttl: Duration,
    clock: C,
}

impl<T> EvictionStore<T, SystemClock> {
    /// Creates a store driven by the system clock.
    ///
    /// # Errors
    /// - `StoreError::InvalidTtl` if `ttl` is zero
    pub fn with_system_clock<F>(key_fn: F, ttl: Duration) -> Result<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::new(key_fn, ttl, SystemClock)
    }
}

impl<T, C: Clock> EvictionStore<T, C> {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `key_fn` - Derives the index key of an object
    /// * `ttl` - Idle time after which an entry is evicted
    /// * `clock` - Time source
    ///
    /// # Errors
    /// - `StoreError::InvalidTtl` if `ttl` is zero
    pub fn new<F>(key_fn: F, ttl: Duration, clock: C) -> Result<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::with_config(key_fn, StoreConfig::new(ttl), clock)
    }

    /// Creates an empty store from a [`StoreConfig`].
    ///
    /// # Errors
    /// - `StoreError::InvalidTtl` if the configured TTL is zero
    pub fn with_config<F>(key_fn: F, config: StoreConfig, clock: C) -> Result<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        config.validate()?;
        debug!(ttl = ?config.ttl, "Creating eviction store");

        Ok(Self {
            inner: Mutex::new(Inner {
                index: HashMap::new(),
                order: RecencyList::new(),
                last_sweep: None,
                stats: StoreStats::new(),
            }),
            key_fn: Box::new(key_fn),
            ttl: config.ttl,
            clock,
        })
    }

    // == Insert ==
    /// Stores an object, or refreshes the entry already held under its key.
    ///
    /// An existing entry has its object overwritten in place and becomes the
    /// most recently touched entry, even if the object is unchanged.
    pub fn insert(&self, object: T) {
        let key = (self.key_fn)(&object);

        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = self.clock.now();

        match inner.live_handle(&key) {
            Some(id) => {
                if let Some(entry) = inner.order.get_mut(id) {
                    entry.replace(object, now);
                }
                inner.order.move_to_front(id);
                inner.stats.record_update();
                trace!(key = %key, "Refreshed existing entry");
            }
            None => {
                let id = inner.order.push_front(Entry::new(object, now));
                inner.index.insert(key, id);
                inner.stats.record_insert();
                trace!("Inserted new entry");
            }
        }

        self.sweep_locked(inner, now);
    }

    // == Lookup ==
    /// Retrieves the object stored under `key` and marks it as touched.
    ///
    /// Returns `None` if the key was never inserted or its entry has expired.
    /// The eviction sweep runs before the key is consulted. An expired entry
    /// still held because the sweep was rate limited is reported as absent and
    /// left for the next due sweep.
    pub fn lookup(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = self.clock.now();

        self.sweep_locked(inner, now);

        let Some(id) = inner.live_handle(key) else {
            inner.stats.record_miss();
            return None;
        };

        let expired = inner
            .order
            .get(id)
            .map_or(true, |entry| entry.is_expired(now, self.ttl));
        if expired {
            inner.stats.record_miss();
            trace!(key = %key, "Expired entry awaiting sweep reported as absent");
            return None;
        }

        inner.order.move_to_front(id);
        let object = inner.order.get_mut(id).map(|entry| {
            entry.touch(now);
            entry.object.clone()
        });

        match object {
            Some(_) => inner.stats.record_hit(),
            None => inner.stats.record_miss(),
        }
        object
    }

    // == Remove ==
    /// Removes the entry stored under `key`.
    ///
    /// Returns the object if the entry was live. A stale entry is dropped and
    /// `None` returned.
    pub fn remove(&self, key: &str) -> Option<T> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = self.clock.now();

        let removed = match inner.live_handle(key) {
            Some(id) => {
                inner.index.remove(key);
                inner.order.remove(id)
            }
            None => None,
        };

        self.sweep_locked(inner, now);

        removed
            .filter(|entry| !entry.is_expired(now, self.ttl))
            .map(|entry| entry.object)
    }

    // == Length ==
    /// Returns the number of entries currently held.
    ///
    /// Stale entries that a rate-limited sweep has not reclaimed yet are
    /// counted; they are never returned by [`lookup`](Self::lookup).
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.inner.lock().order.is_empty()
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Stats ==
    /// Returns a snapshot of the store statistics.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.order.len());
        stats
    }

    // == Sweep ==
    /// Evicts expired entries from the oldest end of the recency list.
    ///
    /// Skipped when the previous sweep ran less than one TTL ago.
    fn sweep_locked(&self, inner: &mut Inner<T>, now: Instant) {
        if let Some(last) = inner.last_sweep {
            match last.checked_add(self.ttl) {
                Some(next) if next > now => return,
                None => return,
                Some(_) => {}
            }
        }

        let mut evicted = 0;
        while let (Some(id), Some(entry)) = (inner.order.back_id(), inner.order.back()) {
            if !entry.is_expired(now, self.ttl) {
                break;
            }

            let key = (self.key_fn)(&entry.object);
            if inner.index.get(&key) == Some(&id) {
                inner.index.remove(&key);
            } else {
                warn!(key = %key, "Evicted entry is not indexed under its key; key function is not stable");
            }
            inner.order.pop_back();
            evicted += 1;
        }

        inner.last_sweep = Some(now);
        inner.stats.record_sweep(evicted);

        if evicted > 0 {
            debug!(
                evicted,
                remaining = inner.order.len(),
                "Eviction sweep removed expired entries"
            );
        } else {
            trace!("Eviction sweep found no expired entries");
        }
    }

    /// Checks that the index and recency list agree and that the list is
    /// ordered newest to oldest. Panics on the first inconsistency.
    #[doc(hidden)]
    pub fn debug_validate_invariants(&self) {
        let inner = self.inner.lock();
        inner.order.debug_validate_invariants();

        assert_eq!(
            inner.index.len(),
            inner.order.len(),
            "index and recency list sizes differ"
        );
        for (key, id) in &inner.index {
            let entry = inner
                .order
                .get(*id)
                .expect("index points at a freed node");
            assert_eq!(&(self.key_fn)(&entry.object), key, "index key mismatch");
        }

        let timestamps: Vec<Instant> = inner.order.iter().map(|entry| entry.timestamp).collect();
        assert!(
            timestamps.windows(2).all(|pair| pair[0] >= pair[1]),
            "recency list is not ordered newest to oldest"
        );
    }
}

impl<T, C> fmt::Debug for EvictionStore<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("EvictionStore")
            .field("ttl", &self.ttl)
            .field("entries", &inner.order.len())
            .field("last_sweep", &inner.last_sweep)
            .finish_non_exhaustive()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::error::StoreError;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(600);

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: String,
        version: u32,
    }

    fn item(key: &str, version: u32) -> Item {
        Item {
            key: key.to_string(),
            version,
        }
    }

    fn new_store() -> (EvictionStore<Item, Arc<FakeClock>>, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new());
        let store = EvictionStore::new(|item: &Item| item.key.clone(), TTL, clock.clone()).unwrap();
        (store, clock)
    }

    fn minutes(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    /// Routes sweep logging to the test output; filter with RUST_LOG.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_store_new() {
        let (store, _) = new_store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.ttl(), TTL);
    }

    #[test]
    fn test_store_rejects_zero_ttl() {
        let result = EvictionStore::new(|item: &Item| item.key.clone(), Duration::ZERO, SystemClock);
        assert!(matches!(result, Err(StoreError::InvalidTtl(_))));
    }

    #[test]
    fn test_store_with_config() {
        let config = StoreConfig::default();
        let store = EvictionStore::with_config(|s: &String| s.clone(), config, SystemClock).unwrap();
        assert_eq!(store.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_store_insert_and_lookup() {
        let (store, _) = new_store();

        store.insert(item("key1", 1));

        assert_eq!(store.lookup("key1"), Some(item("key1", 1)));
        assert_eq!(store.len(), 1);
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_lookup_nonexistent() {
        let (store, _) = new_store();

        assert_eq!(store.lookup("nonexistent"), None);
        assert_eq!(store.lookup("nonexistent"), None);
        assert_eq!(store.stats().misses, 2);
    }

    #[test]
    fn test_store_insert_overwrites_in_place() {
        let (store, _) = new_store();

        store.insert(item("key1", 1));
        store.insert(item("key1", 2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("key1"), Some(item("key1", 2)));

        let stats = store.stats();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.updates, 1);
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_reinsert_refreshes_ttl() {
        let (store, clock) = new_store();

        store.insert(item("key1", 1));
        clock.advance(minutes(8));
        store.insert(item("key1", 1));
        clock.advance(minutes(8));

        assert_eq!(store.lookup("key1"), Some(item("key1", 1)));
    }

    #[test]
    fn test_store_lookup_refreshes_ttl() {
        let (store, clock) = new_store();

        store.insert(item("key1", 1));
        clock.advance(minutes(8));
        assert!(store.lookup("key1").is_some());
        clock.advance(minutes(8));

        assert!(store.lookup("key1").is_some());
    }

    #[test]
    fn test_store_entry_expires_at_ttl_boundary() {
        let (store, clock) = new_store();

        store.insert(item("key1", 1));
        clock.advance(TTL);

        assert_eq!(store.lookup("key1"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_lookup_miss_evicts_other_entries() {
        let (store, clock) = new_store();

        store.insert(item("key1", 1));
        store.insert(item("key2", 1));
        clock.advance(minutes(11));

        assert_eq!(store.lookup("absent"), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_store_sweep_is_rate_limited() {
        init_tracing();
        let (store, clock) = new_store();

        // First operation sweeps at t=0
        store.insert(item("anchor", 1));
        clock.advance(minutes(6));
        store.insert(item("stale", 1));
        clock.advance(minutes(4));
        // t=10: sweep runs, evicts "anchor"
        store.insert(item("fresh", 1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().sweeps, 2);

        clock.advance(minutes(7));
        // t=17: "stale" is 11 minutes old but the next sweep is not due until t=20
        assert!(store.lookup("fresh").is_some());
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().sweeps, 2);

        // Stale entries are never returned, even inside the window, and
        // observing one does not start an early sweep
        assert_eq!(store.lookup("stale"), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().sweeps, 2);

        clock.advance(minutes(3));
        // t=20: the next sweep is due and reclaims "stale"
        assert!(store.lookup("fresh").is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().sweeps, 3);
        assert_eq!(store.lookup("stale"), None);
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_stale_lookup_keeps_sweep_window() {
        let (store, clock) = new_store();

        store.insert(item("anchor", 1));
        clock.advance(minutes(1));
        store.insert(item("x", 1));
        clock.advance(minutes(9));
        // t=10: sweep evicts "anchor"
        store.insert(item("y", 1));
        let sweeps = store.stats().sweeps;

        clock.advance(minutes(2));
        // t=12: "x" is 11 minutes old
        assert_eq!(store.lookup("x"), None);
        assert_eq!(store.stats().sweeps, sweeps);
        assert_eq!(store.stats().misses, 1);

        // Re-inserting revives the held entry in place
        store.insert(item("x", 2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("x"), Some(item("x", 2)));
        assert_eq!(store.stats().sweeps, sweeps);
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_sweep_stops_at_first_fresh_entry() {
        let (store, clock) = new_store();

        store.insert(item("a", 1));
        clock.advance(minutes(5));
        store.insert(item("b", 1));
        clock.advance(minutes(5));
        store.insert(item("c", 1));

        // t=10: "a" swept by the insert of "c"
        assert_eq!(store.len(), 2);
        assert!(store.lookup("b").is_some());
        assert!(store.lookup("c").is_some());
        assert_eq!(store.lookup("a"), None);
    }

    #[test]
    fn test_store_remove() {
        let (store, _) = new_store();

        store.insert(item("key1", 1));

        assert_eq!(store.remove("key1"), Some(item("key1", 1)));
        assert!(store.is_empty());
        assert_eq!(store.remove("key1"), None);
        assert_eq!(store.lookup("key1"), None);
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_remove_stale_returns_none() {
        let (store, clock) = new_store();

        store.insert(item("anchor", 1));
        clock.advance(minutes(5));
        store.insert(item("key1", 1));
        clock.advance(minutes(6));
        // t=11: sweep evicts "anchor" only
        assert!(store.lookup("anchor").is_none());
        clock.advance(minutes(8));

        // t=19: "key1" is 14 minutes old, the next sweep is due at t=21
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove("key1"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_stats() {
        let (store, _) = new_store();

        store.insert(item("key1", 1));
        store.lookup("key1");
        store.lookup("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_store_unstable_key_fn_does_not_corrupt_other_entries() {
        init_tracing();
        let clock = Arc::new(FakeClock::new());
        let flip = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flip_in_fn = flip.clone();
        let store = EvictionStore::new(
            move |item: &Item| {
                if flip_in_fn.load(std::sync::atomic::Ordering::SeqCst) {
                    "other".to_string()
                } else {
                    item.key.clone()
                }
            },
            TTL,
            clock.clone(),
        )
        .unwrap();

        store.insert(item("key1", 1));
        flip.store(true, std::sync::atomic::Ordering::SeqCst);
        store.insert(item("ignored", 2));
        clock.advance(minutes(11));

        // "key1" is evicted from the list; the "other" entry goes with it
        assert_eq!(store.lookup("other"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_evicted_key_does_not_alias_reused_slot() {
        init_tracing();
        let clock = Arc::new(FakeClock::new());
        let flip = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flip_in_fn = flip.clone();
        let store = EvictionStore::new(
            move |item: &Item| {
                if flip_in_fn.load(std::sync::atomic::Ordering::SeqCst) {
                    "other".to_string()
                } else {
                    item.key.clone()
                }
            },
            TTL,
            clock.clone(),
        )
        .unwrap();

        store.insert(item("key1", 1));
        flip.store(true, std::sync::atomic::Ordering::SeqCst);
        clock.advance(minutes(11));
        // Sweep pops "key1" but cannot find its index entry
        assert_eq!(store.lookup("absent"), None);
        assert!(store.is_empty());
        flip.store(false, std::sync::atomic::Ordering::SeqCst);

        // "z" takes over the freed slot
        store.insert(item("z", 9));
        assert_eq!(store.lookup("key1"), None);
        assert_eq!(store.remove("key1"), None);
        assert_eq!(store.lookup("z"), Some(item("z", 9)));

        store.insert(item("key1", 2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("key1"), Some(item("key1", 2)));
        assert_eq!(store.lookup("z"), Some(item("z", 9)));
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_reinsert_after_unindexed_eviction_is_kept() {
        let clock = Arc::new(FakeClock::new());
        let flip = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flip_in_fn = flip.clone();
        let store = EvictionStore::new(
            move |item: &Item| {
                if flip_in_fn.load(std::sync::atomic::Ordering::SeqCst) {
                    "other".to_string()
                } else {
                    item.key.clone()
                }
            },
            TTL,
            clock.clone(),
        )
        .unwrap();

        store.insert(item("key1", 1));
        flip.store(true, std::sync::atomic::Ordering::SeqCst);
        clock.advance(minutes(11));
        assert_eq!(store.lookup("absent"), None);
        flip.store(false, std::sync::atomic::Ordering::SeqCst);

        store.insert(item("key1", 2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("key1"), Some(item("key1", 2)));
        assert_eq!(store.stats().inserts, 2);
        assert_eq!(store.stats().updates, 0);
        store.debug_validate_invariants();
    }

    #[test]
    fn test_store_debug_format() {
        let (store, _) = new_store();
        store.insert(item("key1", 1));

        let rendered = format!("{:?}", store);
        assert!(rendered.contains("EvictionStore"));
        assert!(rendered.contains("entries: 1"));
    }
}
