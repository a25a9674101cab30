//! Contiguous owned sequence with explicit capacity discipline
//!
//! A thin layer over `Vec` that pins down the growth and failure semantics
//! the rest of the crate relies on: power-of-two doubling for dynamic
//! arrays, and a hard bound with a non-panicking overflow path for bounded
//! arrays.

use super::CapacityError;

/// Contiguous owned sequence
///
/// Created either dynamic ([`Array::new`], grows by doubling) or bounded
/// ([`Array::bounded`], fixed logical capacity that is never exceeded).
/// Elements are addressed by index; any reference obtained from the array is
/// invalidated by capacity-changing operations, which the borrow checker
/// enforces.
#[derive(Debug, Clone)]
pub struct Array<T> {
    items: Vec<T>,
    bound: Option<usize>,
}

impl<T> Array<T> {
    /// Smallest first allocation, in bytes
    const FIRST_ALLOC_BYTES: usize = 32;

    /// Create an empty dynamic array
    ///
    /// No allocation happens until the first push.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            bound: None,
        }
    }

    /// Create an empty dynamic array with space reserved for `capacity`
    /// elements
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut array = Self::new();
        array.reserve(capacity);
        array
    }

    /// Create an empty bounded array holding at most `bound` elements
    ///
    /// Storage is allocated up front and never reallocates, so element
    /// addresses are stable for the array's lifetime.
    ///
    /// # Panics
    /// Panics if `bound` is zero.
    #[must_use]
    pub fn bounded(bound: usize) -> Self {
        assert!(bound > 0, "bounded array requires a non-zero capacity");
        Self {
            items: Vec::with_capacity(bound),
            bound: Some(bound),
        }
    }

    /// Number of live elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the array holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The fixed capacity, or `None` for dynamic arrays
    #[must_use]
    pub const fn capacity_bound(&self) -> Option<usize> {
        self.bound
    }

    /// Append a value, growing if necessary
    ///
    /// Returns a reference to the stored element. Amortized O(1).
    ///
    /// # Panics
    /// Panics if the array is bounded and full.
    pub fn push(&mut self, value: T) -> &mut T {
        match self.try_push(value) {
            Ok(stored) => stored,
            Err(err) => panic!("push into full bounded array: {err}"),
        }
    }

    /// Append a value, reporting capacity exhaustion instead of panicking
    ///
    /// # Errors
    /// Returns [`CapacityError`] when the array is bounded and full; the
    /// array is left unmodified.
    pub fn try_push(&mut self, value: T) -> Result<&mut T, CapacityError> {
        if let Some(bound) = self.bound {
            if self.items.len() == bound {
                return Err(CapacityError { capacity: bound });
            }
        } else if self.items.len() == self.items.capacity() {
            self.grow_for(self.items.len() + 1);
        }
        self.items.push(value);
        let index = self.items.len() - 1;
        Ok(&mut self.items[index])
    }

    /// Insert a value at `index`, shifting subsequent elements right
    ///
    /// O(n) in the number of trailing elements.
    ///
    /// # Panics
    /// Panics if `index > len`, or if the array is bounded and full.
    pub fn insert(&mut self, index: usize, value: T) {
        assert!(
            index <= self.items.len(),
            "insert index {index} out of range (len {})",
            self.items.len()
        );
        if let Some(bound) = self.bound {
            assert!(self.items.len() < bound, "insert into full bounded array");
        } else if self.items.len() == self.items.capacity() {
            self.grow_for(self.items.len() + 1);
        }
        self.items.insert(index, value);
    }

    /// Remove and return the value at `index`, shifting subsequent elements
    /// left
    ///
    /// O(n) in the number of trailing elements.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.items.len(),
            "remove index {index} out of range (len {})",
            self.items.len()
        );
        self.items.remove(index)
    }

    /// Index of the first element equal to `value`
    #[must_use]
    pub fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.items.iter().position(|item| item == value)
    }

    /// Index of the first element matching the predicate
    pub fn find_fn<F>(&self, mut test: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().position(|item| test(item))
    }

    /// Ensure room for at least `total` elements
    ///
    /// Dynamic arrays grow to the next doubling step; existing element order
    /// and content are preserved across the move into new storage.
    ///
    /// # Panics
    /// Panics if the array is bounded and `total` exceeds the bound.
    pub fn reserve(&mut self, total: usize) {
        if let Some(bound) = self.bound {
            assert!(
                total <= bound,
                "reserve {total} exceeds fixed capacity {bound}"
            );
        } else if total > self.items.capacity() {
            self.grow_for(total);
        }
    }

    /// Drop all elements, keeping allocated storage
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// View the live elements as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// View the live elements as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Iterate over the live elements
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate mutably over the live elements
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Append every element of `values`
    ///
    /// # Panics
    /// Panics if the array is bounded and the slice does not fit.
    pub fn extend_from_slice(&mut self, values: &[T])
    where
        T: Clone,
    {
        if let Some(bound) = self.bound {
            assert!(
                self.items.len() + values.len() <= bound,
                "extend would exceed fixed capacity {bound}"
            );
        } else if self.items.len() + values.len() > self.items.capacity() {
            self.grow_for(self.items.len() + values.len());
        }
        self.items.extend_from_slice(values);
    }

    /// Grow backing storage so capacity is a doubling step >= `needed`
    fn grow_for(&mut self, needed: usize) {
        let first = (Self::FIRST_ALLOC_BYTES / std::mem::size_of::<T>().max(1)).max(1);
        let mut target = self.items.capacity().max(first);
        while target < needed {
            target *= 2;
        }
        self.items.reserve_exact(target - self.items.len());
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<usize> for Array<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> std::ops::IndexMut<usize> for Array<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}
