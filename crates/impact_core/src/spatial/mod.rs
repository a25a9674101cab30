//! Spatial acceleration structures and mesh queries
//!
//! An index-addressed bounding volume hierarchy ([`Bvh`]) and the
//! [`CollisionMesh`] built on it, answering raycast and sphere push-out
//! queries against static triangle geometry.

mod bvh;
mod collision_mesh;

pub use bvh::{Bvh, BvhNode};
pub use collision_mesh::{
    positions_from_bytes, CollisionMesh, DebugDraw, LoadParams, MeshIndices, MeshTriangle,
    PushOutHit, PushOutInfo, PushOutParams, RaycastHit, RaycastParams, RaycastResult, TriangleRun,
    MAX_PUSH_OUT_HITS, MAX_RAYCAST_HITS,
};
