use crate::SmallKeyBuildHasher;

use core::hash::{BuildHasher, Hash};
use std::collections::{hash_map, HashMap};

/// A bounded-by-the-caller cache that tracks the Least Recently Used element for next eviction.
///
/// LRU order is only updated on insertion, on `touch`, and when an entry is created by `get_mut_or_insert_with`. Plain `get`
/// and `get_mut` leave the order alone.
///
/// Eviction does not happen inline; the owner decides when to call `remove_lru`, since evicting a tile may require flushing it
/// first.
#[derive(Clone, Debug)]
pub struct LruCache<K, V, H> {
    store: HashMap<K, (V, usize), H>,
    order: LruList<K>,
}

/// An `LruCache` using the `ahash` hashing algorithm.
pub type SmallKeyLruCache<K, V> = LruCache<K, V, SmallKeyBuildHasher>;

impl<K, V, H> Default for LruCache<K, V, H>
where
    H: Default,
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, H> LruCache<K, V, H>
where
    K: Hash + Eq,
{
    pub fn with_hasher(hasher_builder: H) -> LruCache<K, V, H> {
        LruCache {
            store: HashMap::with_hasher(hasher_builder),
            order: LruList::new(),
        }
    }
}

impl<K, V, H> LruCache<K, V, H>
where
    K: Hash + Eq + Clone,
    H: BuildHasher,
{
    /// Borrow the value for `key`. This will not update the LRU order.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.store.get(key).map(|(val, _)| val)
    }

    /// Mutably borrow the value for `key`. This will not update the LRU order.
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.store.get_mut(key).map(|(val, _)| val)
    }

    /// Inserts a `new_val` for `key`, returning the old value if it exists. `key` becomes the most recently used.
    #[inline]
    pub fn insert(&mut self, key: K, new_val: V) -> Option<V> {
        let Self { store, order } = self;
        match store.entry(key.clone()) {
            hash_map::Entry::Occupied(occupied) => {
                let (old_val, i) = occupied.into_mut();
                order.move_to_front(*i);

                Some(std::mem::replace(old_val, new_val))
            }
            hash_map::Entry::Vacant(vacant) => {
                let new_i = order.push_front(key);
                vacant.insert((new_val, new_i));

                None
            }
        }
    }

    /// Marks `key` as most recently used. Returns `false` iff there is no entry.
    #[inline]
    pub fn touch(&mut self, key: &K) -> bool {
        let Self { store, order } = self;

        if let Some((_, i)) = store.get(key) {
            order.move_to_front(*i);

            true
        } else {
            false
        }
    }

    /// Gets the value for `key`, calling `on_missing` to populate the entry if there is none. A new entry is marked as most
    /// recently used.
    #[inline]
    pub fn get_mut_or_insert_with(&mut self, key: K, on_missing: impl FnOnce() -> V) -> &mut V {
        let Self { store, order } = self;
        match store.entry(key.clone()) {
            hash_map::Entry::Occupied(occupied) => &mut occupied.into_mut().0,
            hash_map::Entry::Vacant(vacant) => {
                let new_val = on_missing();
                let new_i = order.push_front(key);

                &mut vacant.insert((new_val, new_i)).0
            }
        }
    }

    /// Removes the least recently used entry, or returns `None` when there are no entries.
    #[inline]
    pub fn remove_lru(&mut self) -> Option<(K, V)> {
        if self.is_empty() {
            return None;
        }

        let key = self.order.pop_back()?;
        let (val, _) = self.store.remove(&key)?;

        Some((key, val))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterate over the keys from most to least recently used.
    #[inline]
    pub fn keys(&self) -> LruKeys<'_, K> {
        self.order.iter()
    }

    /// Iterate over all values in unspecified order.
    #[inline]
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.store.values_mut().map(|(val, _)| val)
    }

    /// Iterate over all `(key, value)` pairs in unspecified order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.store.iter().map(|(key, (val, _))| (key, val))
    }
}

/// The recency order of the cache keys. Entries are addressed by their slot index, which the cache stores next to each value,
/// so reordering never searches.
#[derive(Clone, Debug)]
struct LruList<T> {
    entries: Vec<ListEntry<T>>,
}

#[derive(Clone, Debug)]
struct ListEntry<T> {
    value: Option<T>,
    next: usize,
    prev: usize,
}

// Slot 0 heads the ring of free slots and slot 1 heads the ring of used slots, front = most recent.
impl<T> LruList<T> {
    const FREE: usize = 0;
    const OCCUPIED: usize = 1;

    fn new() -> LruList<T> {
        let mut list = LruList {
            entries: Vec::with_capacity(2),
        };
        list.clear();

        list
    }

    fn unlink(&mut self, index: usize) {
        let prev = self.entries[index].prev;
        let next = self.entries[index].next;
        self.entries[prev].next = next;
        self.entries[next].prev = prev;
    }

    fn link_after(&mut self, index: usize, prev: usize) {
        let next = self.entries[prev].next;
        self.entries[index].prev = prev;
        self.entries[index].next = next;
        self.entries[prev].next = index;
        self.entries[next].prev = index;
    }

    fn move_to_front(&mut self, index: usize) {
        self.unlink(index);
        self.link_after(index, Self::OCCUPIED);
    }

    fn push_front(&mut self, value: T) -> usize {
        if self.entries[Self::FREE].next == Self::FREE {
            self.entries.push(ListEntry::<T> {
                value: None,
                next: Self::FREE,
                prev: Self::FREE,
            });
            self.entries[Self::FREE].next = self.entries.len() - 1;
        }
        let index = self.entries[Self::FREE].next;
        self.entries[index].value = Some(value);
        self.unlink(index);
        self.link_after(index, Self::OCCUPIED);

        index
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        self.unlink(index);
        self.link_after(index, Self::FREE);

        self.entries[index].value.take()
    }

    fn back(&self) -> usize {
        self.entries[Self::OCCUPIED].prev
    }

    fn pop_back(&mut self) -> Option<T> {
        let index = self.back();

        self.remove(index)
    }

    fn iter(&self) -> LruKeys<'_, T> {
        LruKeys {
            entries: &self.entries,
            next: self.entries[Self::OCCUPIED].next,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.entries.push(ListEntry::<T> {
            value: None,
            next: 0,
            prev: 0,
        });
        self.entries.push(ListEntry::<T> {
            value: None,
            next: 1,
            prev: 1,
        });
    }
}

/// Walks the occupied list from the front (most recently used).
pub struct LruKeys<'a, T> {
    entries: &'a [ListEntry<T>],
    next: usize,
}

impl<'a, T> Iterator for LruKeys<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == LruList::<T>::OCCUPIED {
            return None;
        }
        let entry = &self.entries[self.next];
        self.next = entry.next;

        entry.value.as_ref()
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
