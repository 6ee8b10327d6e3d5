//! Two-level table keyed by `(outer, inner)` pairs.
//!
//! The outer level is an open-addressing array whose occupied slots each own
//! a private [`LinearProbeTable`] holding that outer key's inner keys. Outer
//! slots appear on the first insert for a new outer key and disappear, with
//! their probe cluster re-placed, once the inner table empties.

use std::fmt;
use std::mem;

use crate::config::{CompositeConfig, TableSizes};
use crate::error::{invariant_violation, Error, Result};
use crate::hash::{KeyHasher, RollingHash};
use crate::linear_probe::{empty_slots, LinearProbeTable, Probe};

#[derive(Clone)]
struct OuterSlot<K1, K2, V, H2> {
    key: K1,
    inner: LinearProbeTable<K2, V, H2>,
}

/// Map from `(outer, inner)` key pairs to values.
///
/// `len` counts pairs, not outer keys. Enumeration follows slot order at both
/// levels and is not stable across growth.
#[derive(Clone)]
pub struct CompositeKeyTable<K1, K2, V, H1 = RollingHash, H2 = RollingHash> {
    slots: Vec<Option<OuterSlot<K1, K2, V, H2>>>,
    /// Number of (outer, inner) pairs
    count: usize,
    /// Number of occupied outer slots
    occupied: usize,
    size_index: usize,
    outer_sizes: TableSizes,
    inner_sizes: TableSizes,
    outer_hasher: H1,
    inner_hasher: H2,
}

impl<K1, K2, V> CompositeKeyTable<K1, K2, V> {
    /// Create an empty table with the default size sequences.
    pub fn new() -> Self {
        Self::with_config(CompositeConfig::default())
    }

    /// Create an empty table with the given configuration.
    pub fn with_config(config: CompositeConfig) -> Self {
        Self::with_hashers(config, RollingHash, RollingHash)
    }
}

impl<K1, K2, V, H1, H2> CompositeKeyTable<K1, K2, V, H1, H2> {
    /// Create an empty table hashing outer keys with `outer_hasher` and inner
    /// keys with a copy of `inner_hasher` per inner table.
    pub fn with_hashers(config: CompositeConfig, outer_hasher: H1, inner_hasher: H2) -> Self {
        let capacity = config.outer_sizes.as_slice()[0];
        Self {
            slots: empty_slots(capacity),
            count: 0,
            occupied: 0,
            size_index: 0,
            outer_sizes: config.outer_sizes,
            inner_sizes: config.inner_sizes,
            outer_hasher,
            inner_hasher,
        }
    }

    /// Number of (outer, inner) pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of distinct outer keys.
    #[inline]
    pub fn outer_len(&self) -> usize {
        self.occupied
    }

    /// Number of slots in the outer array.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn occupied_slots(&self) -> impl Iterator<Item = &OuterSlot<K1, K2, V, H2>> + '_ {
        self.slots.iter().flatten()
    }

    /// All outer keys.
    pub fn keys(&self) -> impl Iterator<Item = &K1> + '_ {
        self.occupied_slots().map(|slot| &slot.key)
    }

    /// All values, flattened across every inner table.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.occupied_slots().flat_map(|slot| slot.inner.values())
    }

    /// All `(outer, inner, value)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&K1, &K2, &V)> + '_ {
        self.occupied_slots()
            .flat_map(|slot| slot.inner.iter().map(move |(k2, v)| (&slot.key, k2, v)))
    }
}

impl<K1, K2, V, H1, H2> CompositeKeyTable<K1, K2, V, H1, H2>
where
    K1: Eq,
    K2: Eq,
    H1: KeyHasher<K1>,
    H2: KeyHasher<K2> + Clone,
{
    /// Walk the outer probe sequence for `outer`.
    fn locate_outer(&self, outer: &K1) -> Option<Probe> {
        let capacity = self.slots.len();
        let mut pos = self.outer_hasher.hash(outer, capacity) % capacity;
        for _ in 0..capacity {
            match &self.slots[pos] {
                None => return Some(Probe::Vacant(pos)),
                Some(slot) if slot.key == *outer => return Some(Probe::Found(pos)),
                Some(_) => pos = (pos + 1) % capacity,
            }
        }
        None
    }

    fn vacant_outer_slot(&self, outer: &K1) -> usize {
        match self.locate_outer(outer) {
            Some(Probe::Vacant(pos)) => pos,
            Some(Probe::Found(_)) => invariant_violation("outer key stored twice"),
            None => invariant_violation("no vacant outer slot while re-placing"),
        }
    }

    fn inner_table(&self, outer: &K1) -> Result<&LinearProbeTable<K2, V, H2>> {
        match self.locate_outer(outer) {
            Some(Probe::Found(pos)) => match &self.slots[pos] {
                Some(slot) => Ok(&slot.inner),
                None => invariant_violation("outer probe found an empty slot"),
            },
            _ => Err(Error::NotFound),
        }
    }

    fn inner_table_mut(&mut self, outer: &K1) -> Result<&mut LinearProbeTable<K2, V, H2>> {
        match self.locate_outer(outer) {
            Some(Probe::Found(pos)) => match &mut self.slots[pos] {
                Some(slot) => Ok(&mut slot.inner),
                None => invariant_violation("outer probe found an empty slot"),
            },
            _ => Err(Error::NotFound),
        }
    }

    pub fn get(&self, outer: &K1, inner: &K2) -> Result<&V> {
        self.inner_table(outer)?.get(inner)
    }

    pub fn get_mut(&mut self, outer: &K1, inner: &K2) -> Result<&mut V> {
        self.inner_table_mut(outer)?.get_mut(inner)
    }

    pub fn contains(&self, outer: &K1, inner: &K2) -> bool {
        self.get(outer, inner).is_ok()
    }

    /// Whether any pair with this outer key is stored.
    pub fn contains_outer(&self, outer: &K1) -> bool {
        matches!(self.locate_outer(outer), Some(Probe::Found(_)))
    }

    /// Inner keys stored under `outer`.
    pub fn keys_for(&self, outer: &K1) -> Result<impl Iterator<Item = &K2> + '_> {
        Ok(self.inner_table(outer)?.keys())
    }

    /// Values stored under `outer`.
    pub fn values_for(&self, outer: &K1) -> Result<impl Iterator<Item = &V> + '_> {
        Ok(self.inner_table(outer)?.values())
    }

    /// Insert or overwrite the value for `(outer, inner)`, returning the
    /// previous value.
    ///
    /// A new outer key claims the first empty outer slot of its probe
    /// sequence. Fails with [`Error::Full`] (leaving the table untouched) when
    /// no outer slot or no inner slot is available and growth is exhausted.
    pub fn set(&mut self, outer: K1, inner: K2, value: V) -> Result<Option<V>> {
        match self.locate_outer(&outer) {
            Some(Probe::Found(pos)) => {
                let slot = match &mut self.slots[pos] {
                    Some(slot) => slot,
                    None => invariant_violation("outer probe found an empty slot"),
                };
                let old = slot.inner.insert(inner, value)?;
                if old.is_none() {
                    self.count += 1;
                }
                Ok(old)
            }
            Some(Probe::Vacant(pos)) => {
                let mut table =
                    LinearProbeTable::with_hasher(self.inner_sizes.clone(), self.inner_hasher.clone());
                table.insert(inner, value)?;
                self.slots[pos] = Some(OuterSlot { key: outer, inner: table });
                self.occupied += 1;
                self.count += 1;
                if self.occupied * 2 > self.slots.len() {
                    self.grow();
                }
                Ok(None)
            }
            None => Err(Error::Full),
        }
    }

    /// Remove `(outer, inner)` and return its value.
    ///
    /// When this empties the outer key's inner table the outer slot is
    /// released and the remainder of its probe cluster is re-placed.
    pub fn delete(&mut self, outer: &K1, inner: &K2) -> Result<V> {
        let pos = match self.locate_outer(outer) {
            Some(Probe::Found(pos)) => pos,
            _ => return Err(Error::NotFound),
        };
        let (value, emptied) = match &mut self.slots[pos] {
            Some(slot) => {
                let value = slot.inner.remove(inner)?;
                (value, slot.inner.is_empty())
            }
            None => invariant_violation("outer probe found an empty slot"),
        };
        self.count -= 1;

        if emptied {
            self.slots[pos] = None;
            self.occupied -= 1;
            self.repair_cluster(pos);
        }
        Ok(value)
    }

    /// Re-place every outer slot in the run that follows the vacated `hole`.
    fn repair_cluster(&mut self, hole: usize) {
        let capacity = self.slots.len();
        let mut next = (hole + 1) % capacity;
        let mut moved = 0usize;
        while let Some(slot) = self.slots[next].take() {
            let target = self.vacant_outer_slot(&slot.key);
            self.slots[target] = Some(slot);
            next = (next + 1) % capacity;
            moved += 1;
        }
        log::trace!("outer cluster repair after slot {hole} re-placed {moved} slots");
    }

    /// Move to the next outer capacity and re-place every outer slot.
    ///
    /// Inner tables travel with their slot; their own capacities are not
    /// affected by outer growth.
    fn grow(&mut self) {
        let Some(capacity) = self.outer_sizes.get(self.size_index + 1) else {
            log::trace!(
                "outer table at final capacity {} with {} outer keys",
                self.slots.len(),
                self.occupied
            );
            return;
        };
        log::debug!(
            "growing outer table {} -> {} slots ({} outer keys, {} pairs)",
            self.slots.len(),
            capacity,
            self.occupied,
            self.count
        );
        self.size_index += 1;
        let old = mem::replace(&mut self.slots, empty_slots(capacity));
        for slot in old.into_iter().flatten() {
            let target = self.vacant_outer_slot(&slot.key);
            self.slots[target] = Some(slot);
        }
    }
}

#[cfg(test)]
impl<K1, K2, V, H1, H2> CompositeKeyTable<K1, K2, V, H1, H2>
where
    K1: Eq,
    K2: Eq,
    H1: KeyHasher<K1>,
    H2: KeyHasher<K2> + Clone,
{
    /// Panic unless every outer key is reachable at its own slot, no inner
    /// table is empty and both counters agree with the slots.
    pub(crate) fn assert_invariants(&self) {
        let mut occupied = 0;
        let mut pairs = 0;
        for (pos, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            occupied += 1;
            pairs += slot.inner.len();
            assert!(!slot.inner.is_empty(), "outer slot {pos} holds an empty inner table");
            assert_eq!(
                self.locate_outer(&slot.key),
                Some(Probe::Found(pos)),
                "outer key in slot {pos} is unreachable"
            );
        }
        assert_eq!(occupied, self.occupied, "outer occupancy counter drifted");
        assert_eq!(pairs, self.count, "pair counter drifted");
        if self.outer_sizes.get(self.size_index + 1).is_some() {
            assert!(self.occupied * 2 <= self.slots.len(), "outer table should have grown");
        }
    }
}

impl<K1, K2, V> Default for CompositeKeyTable<K1, K2, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K1, K2, V, H1, H2> fmt::Debug for CompositeKeyTable<K1, K2, V, H1, H2>
where
    K1: fmt::Debug,
    K2: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k1, k2, v)| ((k1, k2), v)))
            .finish()
    }
}
