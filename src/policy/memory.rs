//! # Bounded In-Memory LRU Cache
//!
//! [`MemoryLruCache`] keeps entries in a [`RecencyIndex`] guarded by a single
//! `parking_lot::Mutex`. Nothing touches disk.
//!
//! ## Operations Flow
//!
//! ```text
//!   PUT new key (cache full, capacity = 3)
//!   ═══════════════════════════════════════════════════════════════════
//!
//!   Before:   head ──► [A] ◄──► [B] ◄──► [C] ◄── tail
//!                      MRU                LRU
//!
//!   put(D):   1. pop_lru() → C        (inside the same lock)
//!             2. insert D at head
//!
//!   After:    head ──► [D] ◄──► [A] ◄──► [B] ◄── tail
//!
//!   GET existing key
//!   ═══════════════════════════════════════════════════════════════════
//!
//!   get(B):   head ──► [B] ◄──► [D] ◄──► [A] ◄── tail
//! ```
//!
//! ## Concurrency Model
//!
//! `get` reorders the list, so a read lock would buy nothing: every operation
//! takes the one mutex. Evict and insert happen in one critical section, so
//! `len() <= capacity()` holds for every observer.
//!
//! Values are cloned out on `get`; wrap large values in `Arc` to make that cheap.

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::trace;

use crate::ds::RecencyIndex;
use crate::error::{CacheResult, ConfigError};
use crate::traits::Cache;

/// Capacity used by the factory for memory caches.
pub const DEFAULT_MEMORY_CAPACITY: usize = 128;

/// Smallest capacity a memory cache accepts.
pub const MINIMAL_CAPACITY: usize = 1;

/// Constructor argument for registering [`MemoryLruCache`] as a custom
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOptions {
    pub capacity: usize,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

/// Thread-safe bounded LRU cache held entirely in process memory.
///
/// # Example
///
/// ```
/// use carbonite::policy::memory::MemoryLruCache;
/// use carbonite::traits::Cache;
///
/// let cache = MemoryLruCache::new(2);
/// cache.put("a", 1).unwrap();
/// cache.put("b", 2).unwrap();
/// cache.get(&"a").unwrap();              // "a" is now MRU
///
/// assert_eq!(cache.put("c", 3).unwrap(), Some("b"));
/// assert!(cache.contains(&"a"));
/// ```
pub struct MemoryLruCache<K, V> {
    inner: Mutex<RecencyIndex<K, V>>,
    capacity: usize,
}

impl<K, V> MemoryLruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. See [`try_new`](Self::try_new).
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a cache, returning an error if `capacity` is below
    /// [`MINIMAL_CAPACITY`].
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity < MINIMAL_CAPACITY {
            return Err(ConfigError::CapacityBelowFloor {
                capacity,
                minimum: MINIMAL_CAPACITY,
            });
        }
        Ok(Self {
            inner: Mutex::new(RecencyIndex::with_capacity(capacity)),
            capacity,
        })
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().keys()
    }
}

impl<K, V> MemoryLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Returns the value without refreshing recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.lock().peek(key).cloned()
    }
}

impl<K, V> Cache<K, V> for MemoryLruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> CacheResult<Option<V>> {
        Ok(self.inner.lock().get(key).cloned())
    }

    fn put(&self, key: K, value: V) -> CacheResult<Option<K>> {
        let mut index = self.inner.lock();

        let mut evicted = None;
        if !index.contains(&key) && index.len() >= self.capacity {
            evicted = index.pop_lru().map(|(k, _)| k);
            trace!(capacity = self.capacity, "memory cache evicted lru entry");
        }
        index.insert(key, value);

        #[cfg(debug_assertions)]
        index.debug_validate_invariants();

        Ok(evicted)
    }

    fn remove(&self, key: &K) -> CacheResult<bool> {
        Ok(self.inner.lock().remove(key).is_some())
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    fn evict_all(&self) -> CacheResult<()> {
        self.inner.lock().clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> fmt::Debug for MemoryLruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLruCache")
            .field("len", &self.inner.lock().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
