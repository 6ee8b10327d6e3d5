//! Single-key open-addressing table with linear probing.
//!
//! This is the base table both nested structures build on: the composite
//! table owns one per outer key. Capacities come from a [`TableSizes`]
//! sequence; the table grows to the next capacity whenever more than half of
//! its slots are occupied, and reports [`Error::Full`] only once the sequence
//! is exhausted and every slot is taken.

use std::fmt;
use std::mem;

use crate::config::TableSizes;
use crate::error::{invariant_violation, Error, Result};
use crate::hash::{KeyHasher, RollingHash};

/// Outcome of scanning a probe sequence for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The key lives at this slot.
    Found(usize),
    /// The key is absent; this is the first empty slot of its sequence.
    Vacant(usize),
}

pub(crate) fn empty_slots<T>(capacity: usize) -> Vec<Option<T>> {
    (0..capacity).map(|_| None).collect()
}

/// Open-addressing hash table with linear probing and prime-sized growth.
///
/// Iteration visits occupied slots in table order, which changes when the
/// table grows.
#[derive(Clone)]
pub struct LinearProbeTable<K, V, H = RollingHash> {
    slots: Vec<Option<(K, V)>>,
    count: usize,
    size_index: usize,
    sizes: TableSizes,
    hasher: H,
}

impl<K, V> LinearProbeTable<K, V, RollingHash> {
    /// Create an empty table using the default size sequence.
    pub fn new() -> Self {
        Self::with_sizes(TableSizes::default())
    }

    /// Create an empty table growing through `sizes`.
    pub fn with_sizes(sizes: TableSizes) -> Self {
        Self::with_hasher(sizes, RollingHash)
    }
}

impl<K, V, H> LinearProbeTable<K, V, H> {
    /// Create an empty table growing through `sizes` and hashing with `hasher`.
    pub fn with_hasher(sizes: TableSizes, hasher: H) -> Self {
        let capacity = sizes.as_slice()[0];
        Self {
            slots: empty_slots(capacity),
            count: 0,
            size_index: 0,
            sizes,
            hasher,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots in the current array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

impl<K, V, H> LinearProbeTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    #[inline]
    fn home_slot(&self, key: &K) -> usize {
        self.hasher.hash(key, self.slots.len()) % self.slots.len()
    }

    /// Walk the probe sequence of `key`.
    ///
    /// Returns `None` when every slot was visited without finding the key or
    /// a gap.
    pub(crate) fn probe(&self, key: &K) -> Option<Probe> {
        let capacity = self.slots.len();
        let mut pos = self.home_slot(key);
        for _ in 0..capacity {
            match &self.slots[pos] {
                None => return Some(Probe::Vacant(pos)),
                Some((k, _)) if k == key => return Some(Probe::Found(pos)),
                Some(_) => pos = (pos + 1) % capacity,
            }
        }
        None
    }

    /// Slot an absent key would be placed in. Only called when a gap exists.
    fn vacant_slot(&self, key: &K) -> usize {
        match self.probe(key) {
            Some(Probe::Vacant(pos)) => pos,
            Some(Probe::Found(_)) => invariant_violation("re-placed key already present"),
            None => invariant_violation("no vacant slot while re-placing an entry"),
        }
    }

    pub fn get(&self, key: &K) -> Result<&V> {
        match self.probe(key) {
            Some(Probe::Found(pos)) => match &self.slots[pos] {
                Some((_, v)) => Ok(v),
                None => invariant_violation("probe found an empty slot"),
            },
            _ => Err(Error::NotFound),
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        match self.probe(key) {
            Some(Probe::Found(pos)) => match &mut self.slots[pos] {
                Some((_, v)) => Ok(v),
                None => invariant_violation("probe found an empty slot"),
            },
            _ => Err(Error::NotFound),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        matches!(self.probe(key), Some(Probe::Found(_)))
    }

    /// Insert or overwrite `key`, returning the previous value.
    ///
    /// Fails with [`Error::Full`] if the key is new, every slot is occupied
    /// and the size sequence is exhausted.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        match self.probe(&key) {
            Some(Probe::Found(pos)) => match &mut self.slots[pos] {
                Some((_, v)) => Ok(Some(mem::replace(v, value))),
                None => invariant_violation("probe found an empty slot"),
            },
            Some(Probe::Vacant(pos)) => {
                self.slots[pos] = Some((key, value));
                self.count += 1;
                if self.count * 2 > self.slots.len() {
                    self.grow();
                }
                Ok(None)
            }
            None => Err(Error::Full),
        }
    }

    /// Remove `key`, re-placing the rest of its probe cluster.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        let pos = match self.probe(key) {
            Some(Probe::Found(pos)) => pos,
            _ => return Err(Error::NotFound),
        };
        let value = match self.slots[pos].take() {
            Some((_, v)) => v,
            None => invariant_violation("probe found an empty slot"),
        };
        self.count -= 1;

        let capacity = self.slots.len();
        let mut next = (pos + 1) % capacity;
        while let Some((k, v)) = self.slots[next].take() {
            let target = self.vacant_slot(&k);
            self.slots[target] = Some((k, v));
            next = (next + 1) % capacity;
        }
        Ok(value)
    }

    fn grow(&mut self) {
        let Some(capacity) = self.sizes.get(self.size_index + 1) else {
            log::trace!(
                "linear probe table at final capacity {} holds {} entries",
                self.slots.len(),
                self.count
            );
            return;
        };
        log::debug!(
            "growing linear probe table {} -> {} slots ({} entries)",
            self.slots.len(),
            capacity,
            self.count
        );
        self.size_index += 1;
        let old = mem::replace(&mut self.slots, empty_slots(capacity));
        for (k, v) in old.into_iter().flatten() {
            let target = self.vacant_slot(&k);
            self.slots[target] = Some((k, v));
        }
    }
}

impl<K, V> Default for LinearProbeTable<K, V, RollingHash> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for LinearProbeTable<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over the occupied slots of a [`LinearProbeTable`].
pub struct Iter<'a, K, V> {
    slots: std::slice::Iter<'a, Option<(K, V)>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some((k, v)) = slot {
                return Some((k, v));
            }
        }
        None
    }
}

impl<'a, K, V, H> IntoIterator for &'a LinearProbeTable<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
