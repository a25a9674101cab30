//! Geometric primitives and bounding volumes
//!
//! The bounding volumes and intersection routines used by the spatial
//! queries: axis-aligned and oriented boxes for coarse pre-filtering, and
//! ray/sphere/triangle tests for precise hits.

mod aabb;
mod obb;
mod primitives;

pub use aabb::Aabb;
pub use obb::Obb;
pub use primitives::{Sphere, Triangle, TriangleHit};
