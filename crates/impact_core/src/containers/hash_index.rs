//! Open-addressing key-to-index table
//!
//! Maps hashable keys to small `u32` payloads (normally positions in a
//! parallel [`Array`](super::Array)). Collisions are resolved by linear
//! probing from the key's home slot, and removal compacts the probe chain by
//! shifting entries backward into the gap, so the table never accumulates
//! tombstones and lookups never degrade across churn.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use rustc_hash::FxHasher;

type BuildFxHasher = BuildHasherDefault<FxHasher>;

/// An occupied slot
#[derive(Debug, Clone)]
struct Slot<K> {
    key: K,
    value: u32,
}

/// Open-addressing table mapping keys to `u32` values
///
/// Dynamic tables ([`HashIndex::new`]) keep occupancy below 7/10 and grow in
/// powers of two. Bounded tables ([`HashIndex::bounded`]) never reallocate
/// and report a full table through [`set`](HashIndex::set) returning `false`.
#[derive(Debug, Clone)]
pub struct HashIndex<K> {
    slots: Vec<Option<Slot<K>>>,
    len: usize,
    bound: Option<usize>,
    hasher: BuildFxHasher,
}

impl<K: Hash + Eq> HashIndex<K> {
    /// Slot count of the first dynamic allocation
    const FIRST_SLOTS: usize = 16;

    /// Create an empty dynamic table
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            bound: None,
            hasher: BuildFxHasher::default(),
        }
    }

    /// Create an empty bounded table with exactly `bound` slots
    ///
    /// # Panics
    /// Panics if `bound` is zero.
    #[must_use]
    pub fn bounded(bound: usize) -> Self {
        assert!(bound > 0, "bounded hash index requires a non-zero capacity");
        let mut slots = Vec::with_capacity(bound);
        slots.resize_with(bound, || None);
        Self {
            slots,
            len: 0,
            bound: Some(bound),
            hasher: BuildFxHasher::default(),
        }
    }

    /// Number of stored entries
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when the table holds no entries
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current slot count
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `value` under `key`
    ///
    /// Returns `true` iff a new slot was occupied, i.e. the key was not
    /// previously present. An existing key has its value overwritten in
    /// place and `false` is returned. A full bounded table returns `false`
    /// without modifying any state; callers that need to distinguish the two
    /// `false` cases probe with [`get`](HashIndex::get) first.
    pub fn set(&mut self, key: K, value: u32) -> bool {
        if self.bound.is_none() && (self.len + 1) * 10 > self.slots.len() * 7 {
            self.grow();
        }
        let cap = self.slots.len();
        let home = self.home(&key);
        for step in 0..cap {
            let idx = (home + step) % cap;
            match &mut self.slots[idx] {
                Some(slot) if slot.key == key => {
                    slot.value = value;
                    return false;
                }
                Some(_) => {}
                empty @ None => {
                    *empty = Some(Slot { key, value });
                    self.len += 1;
                    return true;
                }
            }
        }
        // Probe wrapped the whole table without an empty slot
        false
    }

    /// Value stored under `key`, if present
    ///
    /// Probing stops at the first empty slot: compaction guarantees no gaps
    /// exist between any stored key's home slot and its actual slot.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<u32> {
        self.find_slot(key)
            .and_then(|idx| self.slots[idx].as_ref())
            .map(|slot| slot.value)
    }

    /// Remove `key`, returning its value
    ///
    /// After vacating the slot, subsequent entries in the probe chain are
    /// shifted backward into the gap whenever their home slot allows it, so
    /// every remaining key stays reachable from its home slot.
    pub fn remove(&mut self, key: &K) -> Option<u32> {
        let idx = self.find_slot(key)?;
        let removed = self.slots[idx].take()?;
        self.len -= 1;

        let cap = self.slots.len();
        let mut gap = idx;
        let mut probe = idx;
        loop {
            probe = (probe + 1) % cap;
            let home = match self.slots[probe].as_ref() {
                Some(slot) => self.home(&slot.key),
                None => break,
            };
            // The entry may move into the gap only if its home slot is not
            // circularly between the gap and its current slot.
            let home_distance = (probe + cap - home) % cap;
            let gap_distance = (probe + cap - gap) % cap;
            if home_distance >= gap_distance {
                self.slots[gap] = self.slots[probe].take();
                gap = probe;
            }
        }

        Some(removed.value)
    }

    /// Add one to every stored value `>= from`
    ///
    /// Used when a parallel array shifts elements right after an insertion.
    pub fn increment_from(&mut self, from: u32) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.value >= from {
                slot.value += 1;
            }
        }
    }

    /// Subtract one from every stored value `>= from`
    ///
    /// Used when a parallel array shifts elements left after a removal.
    pub fn decrement_from(&mut self, from: u32) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.value >= from {
                slot.value -= 1;
            }
        }
    }

    /// Remove all entries, keeping allocated slots
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
    }

    /// Slot index currently holding `key`
    fn find_slot(&self, key: &K) -> Option<usize> {
        let cap = self.slots.len();
        if cap == 0 {
            return None;
        }
        let home = self.home(key);
        for step in 0..cap {
            let idx = (home + step) % cap;
            match self.slots[idx].as_ref() {
                Some(slot) if slot.key == *key => return Some(idx),
                Some(_) => {}
                None => return None,
            }
        }
        None
    }

    /// Home slot for `key` in the current slot array
    fn home(&self, key: &K) -> usize {
        debug_assert!(!self.slots.is_empty());
        (self.hasher.hash_one(key) as usize) % self.slots.len()
    }

    /// Double the slot array and re-probe every entry
    fn grow(&mut self) {
        let new_cap = (self.slots.len() * 2).max(Self::FIRST_SLOTS);
        let mut old = std::mem::take(&mut self.slots);
        self.slots.resize_with(new_cap, || None);
        for slot in old.iter_mut() {
            let Some(entry) = slot.take() else { continue };
            let home = self.home(&entry.key);
            for step in 0..new_cap {
                let idx = (home + step) % new_cap;
                if self.slots[idx].is_none() {
                    self.slots[idx] = Some(entry);
                    break;
                }
            }
        }
    }
}

impl<K: Hash + Eq> Default for HashIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut index = HashIndex::new();
        assert!(index.set("alpha".to_string(), 0));
        assert!(index.set("beta".to_string(), 1));
        assert!(!index.set("alpha".to_string(), 7));

        assert_eq!(index.get(&"alpha".to_string()), Some(7));
        assert_eq!(index.get(&"beta".to_string()), Some(1));
        assert_eq!(index.len(), 2);

        assert_eq!(index.remove(&"alpha".to_string()), Some(7));
        assert_eq!(index.get(&"alpha".to_string()), None);
        assert_eq!(index.remove(&"alpha".to_string()), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn string_keys_compare_by_content() {
        let mut index = HashIndex::new();
        let first = String::from("player_spawn");
        let second = String::from("player_spawn");
        index.set(first, 3);
        assert_eq!(index.get(&second), Some(3));
        index.set(second, 9);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn bounded_full_set_fails_without_modifying() {
        let mut index = HashIndex::bounded(3);
        assert!(index.set(1u32, 0));
        assert!(index.set(2u32, 1));
        assert!(index.set(3u32, 2));

        assert!(!index.set(4u32, 3));
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(&4), None);
        assert_eq!(index.get(&1), Some(0));
        assert_eq!(index.get(&2), Some(1));
        assert_eq!(index.get(&3), Some(2));

        // Overwriting an existing key still works while full
        assert!(!index.set(2u32, 8));
        assert_eq!(index.get(&2), Some(8));
    }

    #[test]
    fn compaction_keeps_all_keys_reachable() {
        // Churn a small bounded table so probe chains collide and wrap, and
        // mirror every operation in a std map to catch lost keys.
        let mut index = HashIndex::bounded(8);
        let mut mirror = std::collections::HashMap::new();
        let mut rng = 0x2545_f491_4f6c_dd1du64;

        for round in 0..2000u32 {
            rng = rng.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let key = (rng >> 33) as u32 % 24;
            if rng & 1 == 0 && mirror.len() < 8 {
                let newly_added = index.set(key, round);
                assert_eq!(newly_added, !mirror.contains_key(&key));
                mirror.insert(key, round);
            } else {
                assert_eq!(index.remove(&key), mirror.remove(&key));
            }

            assert_eq!(index.len(), mirror.len());
            for (key, value) in &mirror {
                assert_eq!(index.get(key), Some(*value), "lost key {key}");
            }
        }
    }

    #[test]
    fn dynamic_growth_preserves_entries() {
        let mut index = HashIndex::new();
        for i in 0..500u32 {
            assert!(index.set(i, i * 2));
        }
        assert_eq!(index.len(), 500);
        for i in 0..500u32 {
            assert_eq!(index.get(&i), Some(i * 2));
        }
    }

    #[test]
    fn increment_and_decrement_adjust_stored_values() {
        let mut index = HashIndex::new();
        index.set("a", 0);
        index.set("b", 1);
        index.set("c", 2);

        index.increment_from(1);
        assert_eq!(index.get(&"a"), Some(0));
        assert_eq!(index.get(&"b"), Some(2));
        assert_eq!(index.get(&"c"), Some(3));

        index.decrement_from(2);
        assert_eq!(index.get(&"a"), Some(0));
        assert_eq!(index.get(&"b"), Some(1));
        assert_eq!(index.get(&"c"), Some(2));
    }
}
