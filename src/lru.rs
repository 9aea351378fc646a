//! A small capacity-bounded LRU cache keyed on a structured tuple, used by
//! `CombinedMatcher`'s result cache (spec.md §3, §9 "LRU cache": "Key it on
//! a structured tuple rather than a concatenated string to avoid accidental
//! collisions").
//!
//! Implemented as an `ahash` map from key to (value, recency-generation)
//! plus a generation counter, evicting the stalest entry once capacity is
//! exceeded. This keeps the hot path — lookup and insert — to a single map
//! operation each; exact doubly-linked-list LRU bookkeeping isn't needed at
//! the 10,000-entry scale this cache runs at.

use ahash::AHashMap;
use std::hash::Hash;

struct Slot<V> {
    value: V,
    generation: u64,
}

pub struct LruCache<K, V> {
    capacity: usize,
    generation: u64,
    map: AHashMap<K, Slot<V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        LruCache { capacity: capacity.max(1), generation: 0, map: AHashMap::new() }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.generation += 1;
        let generation = self.generation;
        if let Some(slot) = self.map.get_mut(key) {
            slot.generation = generation;
            Some(slot.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.generation += 1;
        let generation = self.generation;
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) {
            self.evict_oldest();
        }
        self.map.insert(key, Slot { value, generation });
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .map
            .iter()
            .min_by_key(|(_, slot)| slot.generation)
            .map(|(k, _)| k.clone())
        {
            self.map.remove(&oldest_key);
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.generation = 0;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_get_insert() {
        let mut cache: LruCache<u32, &str> = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.get(&3), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache: LruCache<u32, &str> = LruCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.get(&1); // touch 1, making 2 the oldest
        cache.insert(3, "c"); // evicts 2
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache: LruCache<u32, &str> = LruCache::new(4);
        cache.insert(1, "a");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
