//! # Cache Capability
//!
//! This module defines the contract every cache backend implements, built-in
//! or custom, plus the [`Cacheable`] bound for element types that the factory
//! can persist.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────────────────────┐
//!                     │          Cache<K, V>: Send + Sync        │
//!                     │                                          │
//!                     │  get(&K)        → Result<Option<V>>      │
//!                     │  put(K, V)      → Result<Option<K>>      │
//!                     │  remove(&K)     → Result<bool>           │
//!                     │  contains(&K)   → bool                   │
//!                     │  evict_all()    → Result<()>             │
//!                     │  len / is_empty / capacity               │
//!                     └────────────────────┬─────────────────────┘
//!                                          │
//!            ┌─────────────────────────────┼─────────────────────────────┐
//!            ▼                             ▼                             ▼
//!   ┌──────────────────┐       ┌───────────────────────┐      ┌─────────────────────┐
//!   │ MemoryLruCache   │       │ StorageLruCache<T>    │      │ registered custom   │
//!   │ (in-process)     │       │ (one file per entry)  │      │ implementations     │
//!   └──────────────────┘       └───────────────────────┘      └─────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! Every implementation upholds:
//!
//! 1. `len() <= capacity()` at every observable point; a `put` of a new key
//!    into a full cache evicts the least recently used entry first.
//! 2. A successful `get` makes the key the most recently used.
//! 3. `put` on an existing key replaces the value, counts as a use and never
//!    evicts.
//! 4. `remove` of an absent key is a no-op.
//!
//! Methods take `&self`: implementations synchronize internally so a cache
//! can be shared as `Arc<dyn Cache<K, V>>`.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheResult;

/// Common contract for every cache backend.
///
/// # Example
///
/// ```
/// use carbonite::policy::memory::MemoryLruCache;
/// use carbonite::traits::Cache;
///
/// fn warm<C: Cache<String, u32> + ?Sized>(cache: &C, data: &[(&str, u32)]) {
///     for (key, value) in data {
///         cache.put(key.to_string(), *value).unwrap();
///     }
/// }
///
/// let cache = MemoryLruCache::new(10);
/// warm(&cache, &[("a", 1), ("b", 2)]);
/// assert_eq!(cache.len(), 2);
/// assert_eq!(cache.get(&"a".to_string()).unwrap(), Some(1));
/// ```
pub trait Cache<K, V>: Send + Sync {
    /// Returns the value for `key`, refreshing its recency.
    fn get(&self, key: &K) -> CacheResult<Option<V>>;

    /// Inserts or replaces `key`.
    ///
    /// Returns the key evicted to make room, if any.
    fn put(&self, key: K, value: V) -> CacheResult<Option<K>>;

    /// Removes `key`. Returns `false` if it was not cached.
    fn remove(&self, key: &K) -> CacheResult<bool>;

    /// Checks membership without touching recency.
    fn contains(&self, key: &K) -> bool;

    /// Removes every entry.
    fn evict_all(&self) -> CacheResult<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;
}

impl<K, V, C> Cache<K, V> for Box<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> CacheResult<Option<V>> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: V) -> CacheResult<Option<K>> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &K) -> CacheResult<bool> {
        (**self).remove(key)
    }

    fn contains(&self, key: &K) -> bool {
        (**self).contains(key)
    }

    fn evict_all(&self) -> CacheResult<()> {
        (**self).evict_all()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }
}

impl<K, V> fmt::Debug for dyn Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("dyn Cache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Element types the factory can cache in memory and on disk.
///
/// [`type_key`](Self::type_key) is the identity from which a storage cache
/// derives its directory. The default is [`std::any::type_name`], which is
/// stable for a given toolchain; override it when the directory must survive
/// compiler upgrades or type renames.
///
/// ```
/// use carbonite::traits::Cacheable;
/// use serde::{Deserialize, Serialize};
/// use std::borrow::Cow;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Avatar {
///     url: String,
/// }
///
/// impl Cacheable for Avatar {
///     fn type_key() -> Cow<'static, str> {
///         Cow::Borrowed("avatar.v1")
///     }
/// }
///
/// assert_eq!(Avatar::type_key(), "avatar.v1");
/// ```
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn type_key() -> Cow<'static, str> {
        Cow::Borrowed(type_name::<Self>())
    }
}

macro_rules! impl_cacheable {
    ($($ty:ty),* $(,)?) => {
        $(impl Cacheable for $ty {})*
    };
}

impl_cacheable!(
    String, Vec<u8>, bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
    f32, f64,
);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    // Minimal implementation to exercise the default methods and Box forwarding.
    struct MockCache {
        data: Mutex<VecDeque<(u32, String)>>,
        capacity: usize,
    }

    impl Cache<u32, String> for MockCache {
        fn get(&self, key: &u32) -> CacheResult<Option<String>> {
            Ok(self
                .data
                .lock()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()))
        }

        fn put(&self, key: u32, value: String) -> CacheResult<Option<u32>> {
            let mut data = self.data.lock();
            if let Some(slot) = data.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
                return Ok(None);
            }
            let evicted = if data.len() >= self.capacity {
                data.pop_front().map(|(k, _)| k)
            } else {
                None
            };
            data.push_back((key, value));
            Ok(evicted)
        }

        fn remove(&self, key: &u32) -> CacheResult<bool> {
            let mut data = self.data.lock();
            let before = data.len();
            data.retain(|(k, _)| k != key);
            Ok(data.len() != before)
        }

        fn contains(&self, key: &u32) -> bool {
            self.data.lock().iter().any(|(k, _)| k == key)
        }

        fn evict_all(&self) -> CacheResult<()> {
            self.data.lock().clear();
            Ok(())
        }

        fn len(&self) -> usize {
            self.data.lock().len()
        }

        fn capacity(&self) -> usize {
            self.capacity
        }
    }

    #[test]
    fn boxed_dyn_cache_forwards() {
        let cache: Box<dyn Cache<u32, String>> = Box::new(MockCache {
            data: Mutex::new(VecDeque::new()),
            capacity: 1,
        });

        assert!(cache.is_empty());
        assert_eq!(cache.put(1, "one".into()).unwrap(), None);
        assert_eq!(cache.put(2, "two".into()).unwrap(), Some(1));
        assert!(!cache.contains(&1));
        assert_eq!(cache.get(&2).unwrap(), Some("two".to_string()));
        assert!(cache.remove(&2).unwrap());
        assert!(!cache.remove(&2).unwrap());
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn default_type_key_is_type_name() {
        assert_eq!(String::type_key(), type_name::<String>());
        assert_ne!(u32::type_key(), u64::type_key());
    }
}
