//! Recency-ordered index backed by a slot vector.
//!
//! Stores `(key, value)` nodes in a `Vec<Option<Node>>` slab, links them by
//! [`SlotId`] into a doubly linked list ordered from most- to least-recently
//! used, and keeps an `FxHashMap<K, SlotId>` for O(1) lookup.
//!
//! ## Architecture
//!
//! ```text
//!   map (FxHashMap<K, SlotId>)          slots (Vec<Option<Node<K, V>>>)
//!   ┌──────┬────────┐                   ┌────────┬──────────────────────────────┐
//!   │ "a"  │ id_0   │ ────────────────► │ id_0   │ { a, prev: id_2, next: None }│
//!   │ "b"  │ id_1   │ ────────────────► │ id_1   │ { b, prev: None, next: id_2 }│
//!   │ "c"  │ id_2   │ ────────────────► │ id_2   │ { c, prev: id_1, next: id_0 }│
//!   └──────┴────────┘                   └────────┴──────────────────────────────┘
//!
//!   head (MRU) ─► [b] ◄──► [c] ◄──► [a] ◄── tail (LRU)
//! ```
//!
//! Freed slots are recycled through a free list, so steady-state churn does
//! not allocate.
//!
//! ## Operations
//! - `insert(k, v)`: add at MRU, or replace in place and move to MRU
//! - `get(&k)` / `touch(&k)`: move to MRU
//! - `peek(&k)`: lookup without reordering
//! - `pop_lru()` / `peek_lru()`: tail access
//! - `remove(&k)`: unlink + free slot
//!
//! All of the above are O(1); `iter` and `recency_rank` are O(n).
//!
//! The index never enforces a capacity; owners decide when to `pop_lru`.

use std::borrow::Borrow;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Stable handle to a slot in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Hash index plus recency list. Not thread-safe; callers wrap it in a lock.
#[derive(Debug)]
pub struct RecencyIndex<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free_list: Vec<usize>,
    map: FxHashMap<K, SlotId>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<K, V> Default for RecencyIndex<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RecencyIndex<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty index with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Inserts at the MRU position.
    ///
    /// An existing key keeps its slot, has its value replaced and is moved
    /// to MRU; the previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&id) = self.map.get(&key) {
            let previous = self
                .node_mut(id)
                .map(|node| std::mem::replace(&mut node.value, value));
            self.move_to_front(id);
            return previous;
        }

        let id = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.map.insert(key, id);
        self.attach_front(id);
        None
    }

    /// Returns the value and moves the entry to MRU.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.move_to_front(id);
        self.node(id).map(|node| &node.value)
    }

    /// Returns the value without changing recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.node(id).map(|node| &node.value)
    }

    /// Moves the entry to MRU. Returns `false` if the key is absent.
    pub fn touch<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key) {
            Some(&id) => {
                self.move_to_front(id);
                true
            },
            None => false,
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.map.remove(key)?;
        self.detach(id);
        self.release(id).map(|node| node.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let id = self.tail?;
        self.detach(id);
        let node = self.release(id)?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Returns the least recently used entry without removing it.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.tail
            .and_then(|id| self.node(id))
            .map(|node| (&node.key, &node.value))
    }

    /// Position in recency order, 0 being the most recently used.
    pub fn recency_rank<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let target = *self.map.get(key)?;
        self.iter_ids().position(|id| id == target)
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            index: self,
            cursor: self.head,
        }
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.map.clear();
        self.head = None;
        self.tail = None;
    }

    fn iter_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        std::iter::successors(self.head, move |&id| self.node(id).and_then(|n| n.next))
    }

    fn node(&self, id: SlotId) -> Option<&Node<K, V>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: SlotId) -> Option<&mut Node<K, V>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn alloc(&mut self, node: Node<K, V>) -> SlotId {
        match self.free_list.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                SlotId(idx)
            },
            None => {
                self.slots.push(Some(node));
                SlotId(self.slots.len() - 1)
            },
        }
    }

    fn release(&mut self, id: SlotId) -> Option<Node<K, V>> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free_list.push(id.0);
        Some(node)
    }

    fn move_to_front(&mut self, id: SlotId) {
        if self.head == Some(id) {
            return;
        }
        self.detach(id);
        self.attach_front(id);
    }

    fn detach(&mut self, id: SlotId) {
        let (prev, next) = match self.node(id) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            },
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            },
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.node_mut(h) {
                    node.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    /// Panics if the list and the map disagree.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let mut count = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self.node(id).expect("linked slot must be occupied");
            assert_eq!(node.prev, prev, "broken back link");
            assert_eq!(self.map.get(&node.key), Some(&id), "map points elsewhere");
            count += 1;
            assert!(count <= self.map.len(), "cycle in recency list");
            prev = Some(id);
            cursor = node.next;
        }
        assert_eq!(self.tail, prev, "tail is not the last node");
        assert_eq!(count, self.map.len());
        assert_eq!(
            self.slots.len() - self.free_list.len(),
            self.map.len(),
            "occupied slots mismatch"
        );
    }
}

/// Iterator from MRU to LRU.
pub struct Iter<'a, K, V> {
    index: &'a RecencyIndex<K, V>,
    cursor: Option<SlotId>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.index.node(self.cursor?)?;
        self.cursor = node.next;
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(keys: &[&'static str]) -> RecencyIndex<String, usize> {
        let mut index = RecencyIndex::new();
        for (i, key) in keys.iter().enumerate() {
            index.insert(key.to_string(), i);
        }
        index
    }

    #[test]
    fn insert_orders_most_recent_first() {
        let index = index_of(&["a", "b", "c"]);
        assert_eq!(index.keys(), vec!["c", "b", "a"]);
        assert_eq!(index.peek_lru(), Some((&"a".to_string(), &0)));
        index.debug_validate_invariants();
    }

    #[test]
    fn get_moves_to_front() {
        let mut index = index_of(&["a", "b", "c"]);
        assert_eq!(index.get("a"), Some(&0));
        assert_eq!(index.keys(), vec!["a", "c", "b"]);
        assert_eq!(index.recency_rank("b"), Some(2));
        index.debug_validate_invariants();
    }

    #[test]
    fn peek_keeps_order() {
        let index = index_of(&["a", "b"]);
        assert_eq!(index.peek("a"), Some(&0));
        assert_eq!(index.keys(), vec!["b", "a"]);
    }

    #[test]
    fn reinsert_replaces_and_refreshes() {
        let mut index = index_of(&["a", "b"]);
        assert_eq!(index.insert("a".to_string(), 10), Some(0));
        assert_eq!(index.len(), 2);
        assert_eq!(index.keys(), vec!["a", "b"]);
        assert_eq!(index.peek("a"), Some(&10));
        index.debug_validate_invariants();
    }

    #[test]
    fn pop_lru_drains_in_order() {
        let mut index = index_of(&["a", "b", "c"]);
        index.touch("a");
        let drained: Vec<_> = std::iter::from_fn(|| index.pop_lru().map(|(k, _)| k)).collect();
        assert_eq!(drained, vec!["b", "c", "a"]);
        assert!(index.is_empty());
        assert_eq!(index.peek_lru(), None);
        index.debug_validate_invariants();
    }

    #[test]
    fn remove_middle_relinks() {
        let mut index = index_of(&["a", "b", "c"]);
        assert_eq!(index.remove("b"), Some(1));
        assert_eq!(index.remove("b"), None);
        assert_eq!(index.keys(), vec!["c", "a"]);
        index.debug_validate_invariants();
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut index = index_of(&["a", "b"]);
        index.remove("a");
        index.insert("z".to_string(), 9);
        assert_eq!(index.slots.len(), 2);
        index.debug_validate_invariants();
    }

    #[test]
    fn touch_absent_is_false() {
        let mut index = index_of(&["a"]);
        assert!(!index.touch("missing"));
        assert!(index.touch("a"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut index = index_of(&["a", "b", "c"]);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
        index.insert("d".to_string(), 3);
        assert_eq!(index.keys(), vec!["d"]);
        index.debug_validate_invariants();
    }
}
