//! Generic container types
//!
//! The containers here back every higher-level structure in the crate: the
//! [`Array`] is the contiguous storage primitive, the [`HashIndex`] is an
//! open-addressing key-to-index table with tombstone-free removal, and the
//! [`Map`] pairs the two into an ordered key/value container.
//!
//! Capacity discipline is chosen at construction: dynamic containers grow by
//! doubling, bounded containers never reallocate and report exhaustion
//! through [`CapacityError`] instead of failing fatally.

mod array;
mod hash_index;
mod map;

pub use array::Array;
pub use hash_index::HashIndex;
pub use map::{Map, Pair};

use thiserror::Error;

/// A bounded container was asked to hold more entries than its fixed capacity
///
/// The failing operation leaves the container unmodified.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("fixed capacity of {capacity} exceeded")]
pub struct CapacityError {
    /// The fixed capacity the container was constructed with
    pub capacity: usize,
}
