use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// A fixed-capacity associative cache with least-recently-used ordering.
///
/// The recency list is a doubly linked list threaded through an arena of
/// slots addressed by integer handles, so every operation is O(1) without
/// reference-counted links. `capacity` is advisory: the cache never evicts
/// on its own, the caller decides when (and whether) to call `evict_lru`.
///
/// The cache knows nothing about pages, dirtiness or transactions.
pub struct LruCache<K, V> {
    map: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Look up a value and mark it most-recently-used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let handle = *self.map.get(key)?;
        self.unlink(handle);
        self.push_front(handle);
        self.slots[handle].as_ref().map(|slot| &slot.value)
    }

    /// Look up a value without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let handle = *self.map.get(key)?;
        self.slots[handle].as_ref().map(|slot| &slot.value)
    }

    /// Insert or update a value and mark it most-recently-used.
    ///
    /// Never evicts, even when the cache is over capacity.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&handle) = self.map.get(&key) {
            self.slots[handle].as_mut().unwrap().value = value;
            self.unlink(handle);
            self.push_front(handle);
            return;
        }

        let handle = match self.free.pop() {
            Some(handle) => {
                self.slots[handle] = Some(Slot {
                    key: key.clone(),
                    value,
                    prev: NIL,
                    next: NIL,
                });
                handle
            }
            None => {
                self.slots.push(Some(Slot {
                    key: key.clone(),
                    value,
                    prev: NIL,
                    next: NIL,
                }));
                self.slots.len() - 1
            }
        };
        self.map.insert(key, handle);
        self.push_front(handle);
    }

    /// Remove and return the least-recently-used entry.
    pub fn evict_lru(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        let key = self.slots[self.tail].as_ref().unwrap().key.clone();
        let value = self.evict(&key)?;
        Some((key, value))
    }

    /// Remove a specific entry.
    pub fn evict(&mut self, key: &K) -> Option<V> {
        let handle = self.map.remove(key)?;
        self.unlink(handle);
        let slot = self.slots[handle].take().unwrap();
        self.free.push(handle);
        Some(slot.value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Keys from least- to most-recently-used.
    pub fn lru_keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut handle = self.tail;
        while handle != NIL {
            let slot = self.slots[handle].as_ref().unwrap();
            keys.push(slot.key.clone());
            handle = slot.prev;
        }
        keys
    }

    fn unlink(&mut self, handle: usize) {
        let (prev, next) = {
            let slot = self.slots[handle].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev].as_mut().unwrap().next = next;
        } else if self.head == handle {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].as_mut().unwrap().prev = prev;
        } else if self.tail == handle {
            self.tail = prev;
        }
        let slot = self.slots[handle].as_mut().unwrap();
        slot.prev = NIL;
        slot.next = NIL;
    }

    fn push_front(&mut self, handle: usize) {
        {
            let slot = self.slots[handle].as_mut().unwrap();
            slot.prev = NIL;
            slot.next = self.head;
        }
        if self.head != NIL {
            self.slots[self.head].as_mut().unwrap().prev = handle;
        }
        self.head = handle;
        if self.tail == NIL {
            self.tail = handle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resident_set_tracks_recency() {
        let mut cache: LruCache<u32, String> = LruCache::new(3);

        for i in 0..3 {
            cache.put(i, format!("v{}", i));
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.lru_keys(), vec![0, 1, 2]);

        // touching 0 makes 1 the eviction candidate
        assert_eq!(cache.get(&0), Some(&"v0".to_string()));
        assert_eq!(cache.lru_keys(), vec![1, 2, 0]);

        cache.put(3, "v3".to_string());
        let (victim, _) = cache.evict_lru().unwrap();
        assert_eq!(victim, 1);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&0));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn test_put_updates_in_place() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        cache.put(7, 1);
        cache.put(8, 2);
        cache.put(7, 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&7), Some(&3));
        // update marked 7 most-recently-used, so 8 is the victim
        assert_eq!(cache.evict_lru().unwrap().0, 8);
    }

    #[test]
    fn test_peek_keeps_order() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.peek(&1), Some(&1));
        assert_eq!(cache.evict_lru().unwrap().0, 1);
    }

    #[test]
    fn test_evict_specific_and_reuse() {
        let mut cache: LruCache<u32, u32> = LruCache::new(4);
        for i in 0..4 {
            cache.put(i, i * 10);
        }
        assert_eq!(cache.evict(&2), Some(20));
        assert_eq!(cache.evict(&2), None);
        assert_eq!(cache.lru_keys(), vec![0, 1, 3]);

        // the freed slot is reused by the next insert
        cache.put(9, 90);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.lru_keys(), vec![0, 1, 3, 9]);
    }

    #[test]
    fn test_empty_cache() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        assert_eq!(cache.get(&1), None);
        assert!(cache.evict_lru().is_none());
        assert_eq!(cache.len(), 0);
    }
}
