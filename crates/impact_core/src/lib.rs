//! # Impact Core
//!
//! Container and collision-mesh core for game runtimes.
//!
//! ## Features
//!
//! - **Containers**: contiguous [`Array`](containers::Array) with dynamic or
//!   bounded capacity, an open-addressing [`HashIndex`](containers::HashIndex)
//!   with tombstone-free removal, and an ordered [`Map`](containers::Map)
//!   built on both.
//! - **Geometry**: AABB/OBB bounding volumes, ray/sphere/triangle
//!   intersection routines.
//! - **Spatial queries**: an index-addressed [`Bvh`](spatial::Bvh) and a
//!   [`CollisionMesh`](spatial::CollisionMesh) answering raycast and sphere
//!   push-out queries against static triangle geometry.
//!
//! ## Quick Start
//!
//! ```rust
//! use impact_core::prelude::*;
//!
//! let mut mesh = CollisionMesh::new();
//! mesh.load(LoadParams {
//!     positions: &[
//!         Vec3::new(-1.0, -1.0, 0.0),
//!         Vec3::new(1.0, -1.0, 0.0),
//!         Vec3::new(1.0, 1.0, 0.0),
//!         Vec3::new(-1.0, 1.0, 0.0),
//!     ],
//!     indices: Some(MeshIndices::U16(&[0, 1, 2, 0, 2, 3])),
//!     transform: None,
//! });
//!
//! let result = mesh.raycast(
//!     &RaycastParams {
//!         source: Vec3::new(0.0, 0.0, 5.0),
//!         direction: Vec3::new(0.0, 0.0, -1.0),
//!         max_hits: 1,
//!         ..RaycastParams::default()
//!     },
//!     RaycastResult::default(),
//! );
//! assert_eq!(result.hits.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod containers;
pub mod geom;
pub mod spatial;

pub use containers::CapacityError;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        containers::{Array, HashIndex, Map},
        foundation::math::{Mat4, Vec3, Vec4},
        geom::{Aabb, Obb, Sphere, Triangle},
        spatial::{
            Bvh, CollisionMesh, LoadParams, MeshIndices, PushOutInfo, PushOutParams,
            RaycastParams, RaycastResult,
        },
        CapacityError,
    };
}
