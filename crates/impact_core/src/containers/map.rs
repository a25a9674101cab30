//! Ordered key/value container backed by a hash index
//!
//! A [`Map`] keeps its pairs in a contiguous [`Array`] (so iteration and
//! positional access are cache-friendly) and resolves keys through a
//! [`HashIndex`] storing each key's position. The two structures are kept
//! consistent across every mutation: ordered insertion and removal shift the
//! pair array and bulk-adjust the stored positions to match.

use std::hash::Hash;

use super::{Array, CapacityError, HashIndex};

/// A key/value pair stored in a [`Map`]
#[derive(Debug, Clone)]
pub struct Pair<K, V> {
    /// The lookup key
    pub key: K,
    /// The stored value
    pub value: V,
}

/// Ordered key/value container
///
/// Two removal disciplines are available:
///
/// - **fast** ([`Map::new`]): removal swaps the last pair into the hole, so
///   iteration order after removals is unspecified.
/// - **stable** ([`Map::stable`]): removal shifts pairs left and
///   [`set_at`](Map::set_at) may insert at an explicit position; the
///   established order is preserved across arbitrary insert/remove
///   sequences.
///
/// Keys are stored in both the pair array and the hash index, hence
/// `K: Clone`.
#[derive(Debug, Clone)]
pub struct Map<K, V> {
    entries: Array<Pair<K, V>>,
    index: HashIndex<K>,
    stable: bool,
}

impl<K: Hash + Eq + Clone, V> Map<K, V> {
    /// Create an empty fast-mode map
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Array::new(),
            index: HashIndex::new(),
            stable: false,
        }
    }

    /// Create an empty stable-mode map
    ///
    /// Stable maps preserve pair order across removals and support
    /// explicit-position insertion with [`set_at`](Map::set_at).
    #[must_use]
    pub fn stable() -> Self {
        Self {
            entries: Array::new(),
            index: HashIndex::new(),
            stable: true,
        }
    }

    /// Create an empty fast-mode map holding at most `bound` pairs
    ///
    /// # Panics
    /// Panics if `bound` is zero.
    #[must_use]
    pub fn bounded(bound: usize) -> Self {
        Self {
            entries: Array::bounded(bound),
            index: HashIndex::bounded(bound),
            stable: false,
        }
    }

    /// Create an empty stable-mode map holding at most `bound` pairs
    ///
    /// Combines the fixed capacity of [`bounded`](Map::bounded) with the
    /// order guarantees of [`stable`](Map::stable).
    ///
    /// # Panics
    /// Panics if `bound` is zero.
    #[must_use]
    pub fn bounded_stable(bound: usize) -> Self {
        Self {
            entries: Array::bounded(bound),
            index: HashIndex::bounded(bound),
            stable: true,
        }
    }

    /// Number of stored pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map holds no pairs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `value` under `key`, appending a new pair for a new key
    ///
    /// An existing key keeps its position; only its value changes. Returns a
    /// reference to the stored value.
    ///
    /// # Panics
    /// Panics if the map is bounded and full and `key` is new.
    pub fn set(&mut self, key: K, value: V) -> &mut V {
        match self.try_set(key, value) {
            Ok(position) => &mut self.entries[position].value,
            Err(err) => panic!("set into full bounded map: {err}"),
        }
    }

    /// Store `value` under `key`, reporting capacity exhaustion
    ///
    /// Returns the position of the stored pair.
    ///
    /// # Errors
    /// Returns [`CapacityError`] when the map is bounded, full, and `key` is
    /// not already present; the map is left unmodified.
    pub fn try_set(&mut self, key: K, value: V) -> Result<usize, CapacityError> {
        if let Some(position) = self.index.get(&key) {
            let position = position as usize;
            self.entries[position].value = value;
            return Ok(position);
        }
        let position = self.entries.len();
        self.entries.try_push(Pair {
            key: key.clone(),
            value,
        })?;
        let _newly_added = self.index.set(key, position as u32);
        debug_assert!(_newly_added);
        Ok(position)
    }

    /// Store `value` under `key` at an explicit position (stable mode)
    ///
    /// New keys are inserted at `position`, shifting subsequent pairs right
    /// and adjusting their index entries. An existing key keeps its current
    /// position — the requested position is ignored and only the value is
    /// overwritten.
    ///
    /// # Panics
    /// Panics on a fast-mode map, or if `position > len`.
    pub fn set_at(&mut self, key: K, value: V, position: usize) -> &mut V {
        assert!(self.stable, "set_at requires a stable-mode map");
        if let Some(existing) = self.index.get(&key) {
            let existing = existing as usize;
            self.entries[existing].value = value;
            return &mut self.entries[existing].value;
        }
        self.entries.insert(
            position,
            Pair {
                key: key.clone(),
                value,
            },
        );
        self.index.increment_from(position as u32);
        let _newly_added = self.index.set(key, position as u32);
        debug_assert!(_newly_added);
        &mut self.entries[position].value
    }

    /// Remove `key`, returning its value
    ///
    /// Stable maps shift subsequent pairs left; fast maps swap the last pair
    /// into the hole and re-point its index entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let position = self.index.remove(key)? as usize;
        Some(self.detach(position))
    }

    /// Remove the pair at `position`, returning its value
    ///
    /// Follows the map's removal discipline: stable maps shift subsequent
    /// pairs left, fast maps swap the last pair into the hole.
    ///
    /// # Panics
    /// Panics if `position >= len`.
    pub fn remove_at(&mut self, position: usize) -> V {
        assert!(
            position < self.entries.len(),
            "remove_at position {position} out of range (len {})",
            self.entries.len()
        );
        let key = self.entries[position].key.clone();
        let _mapped = self.index.remove(&key);
        debug_assert_eq!(_mapped, Some(position as u32));
        self.detach(position)
    }

    /// Take the pair at `position` out of the pair array, keeping the index
    /// consistent
    ///
    /// The key's own index entry must already be gone.
    fn detach(&mut self, position: usize) -> V {
        if self.stable {
            let pair = self.entries.remove(position);
            self.index.decrement_from(position as u32);
            return pair.value;
        }

        let last = self.entries.len() - 1;
        if position == last {
            return self.entries.remove(position).value;
        }
        let last_pair = self.entries.remove(last);
        let removed = std::mem::replace(&mut self.entries[position], last_pair);
        let moved_key = self.entries[position].key.clone();
        self.index.set(moved_key, position as u32);
        removed.value
    }

    /// Value stored under `key`
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let position = self.index.get(key)? as usize;
        Some(&self.entries[position].value)
    }

    /// Mutable value stored under `key`
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let position = self.index.get(key)? as usize;
        Some(&mut self.entries[position].value)
    }

    /// Position of `key` in the pair array
    #[must_use]
    pub fn get_index(&self, key: &K) -> Option<usize> {
        self.index.get(key).map(|position| position as usize)
    }

    /// Key at `position`
    ///
    /// # Panics
    /// Panics if `position >= len`.
    #[must_use]
    pub fn key_at(&self, position: usize) -> &K {
        &self.entries[position].key
    }

    /// Value at `position`
    ///
    /// # Panics
    /// Panics if `position >= len`.
    #[must_use]
    pub fn value_at(&self, position: usize) -> &V {
        &self.entries[position].value
    }

    /// Mutable value at `position`
    ///
    /// # Panics
    /// Panics if `position >= len`.
    pub fn value_at_mut(&mut self, position: usize) -> &mut V {
        &mut self.entries[position].value
    }

    /// Iterate over pairs in positional order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|pair| (&pair.key, &pair.value))
    }

    /// Ensure room for at least `total` pairs
    ///
    /// # Panics
    /// Panics if the map is bounded and `total` exceeds the bound.
    pub fn reserve(&mut self, total: usize) {
        self.entries.reserve(total);
    }

    /// Remove all pairs, keeping allocated storage
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<K: Hash + Eq + Clone, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
