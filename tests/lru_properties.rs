// ==============================================
// LRU PROPERTY TESTS (integration)
// ==============================================
//
// Both built-in backends are driven with random operation sequences and
// compared against a plain recency list.

use std::collections::VecDeque;
use std::sync::Arc;

use carbonite::policy::memory::MemoryLruCache;
use carbonite::policy::storage::{StorageLruCache, StorageOptions};
use carbonite::serialization::BincodeSerializer;
use carbonite::traits::Cache;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u32),
    Get(u8),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..12, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        3 => (0u8..12).prop_map(Op::Get),
        1 => (0u8..12).prop_map(Op::Remove),
    ]
}

/// Front is most recently used.
struct Model {
    entries: VecDeque<(String, u32)>,
    capacity: usize,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn put(&mut self, key: String, value: u32) -> Option<String> {
        if let Some(pos) = self.position(&key) {
            self.entries.remove(pos);
            self.entries.push_front((key, value));
            return None;
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_back().map(|(k, _)| k)
        } else {
            None
        };
        self.entries.push_front((key, value));
        evicted
    }

    fn get(&mut self, key: &str) -> Option<u32> {
        let pos = self.position(key)?;
        let entry = self.entries.remove(pos)?;
        let value = entry.1;
        self.entries.push_front(entry);
        Some(value)
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            },
            None => false,
        }
    }
}

fn check_against_model<C: Cache<String, u32>>(
    cache: &C,
    capacity: usize,
    ops: &[Op],
) -> Result<(), TestCaseError> {
    let mut model = Model::new(capacity);

    for op in ops {
        match op {
            Op::Put(k, v) => {
                let key = format!("k{k}");
                let expected = model.put(key.clone(), *v);
                prop_assert_eq!(cache.put(key, *v).unwrap(), expected);
            },
            Op::Get(k) => {
                let key = format!("k{k}");
                prop_assert_eq!(cache.get(&key).unwrap(), model.get(&key));
            },
            Op::Remove(k) => {
                let key = format!("k{k}");
                prop_assert_eq!(cache.remove(&key).unwrap(), model.remove(&key));
            },
        }
        prop_assert!(cache.len() <= cache.capacity());
        prop_assert_eq!(cache.len(), model.entries.len());
    }

    for (key, _) in &model.entries {
        prop_assert!(cache.contains(key));
    }
    Ok(())
}

proptest! {
    /// Property: memory cache matches the reference LRU for any sequence
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_memory_matches_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(op(), 0..120)
    ) {
        let cache = MemoryLruCache::new(capacity);
        check_against_model(&cache, capacity, &ops)?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: storage cache matches the reference LRU, and its directory
    /// holds exactly one file per cached key
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_storage_matches_model(
        capacity in 1usize..5,
        ops in prop::collection::vec(op(), 0..60)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let options = StorageOptions::new(
            dir.path(),
            capacity,
            Arc::new(BincodeSerializer::<u32>::new()),
        );
        let cache = StorageLruCache::open(options).unwrap();
        check_against_model(&cache, capacity, &ops)?;

        let files = std::fs::read_dir(dir.path()).unwrap().count();
        prop_assert_eq!(files, cache.len());
    }
}
