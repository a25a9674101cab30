//! Static triangle mesh with BVH-accelerated queries
//!
//! A [`CollisionMesh`] accumulates triangle geometry across one or more
//! [`load`](CollisionMesh::load) calls — each call appends vertices and
//! triangles and builds one BVH over the new range, so a mesh may hold
//! several independent trees. Queries ([`raycast`](CollisionMesh::raycast),
//! [`push_out`](CollisionMesh::push_out)) take `&self` and may run from many
//! threads while no mutating call is in flight.

use log::debug;

use crate::containers::Array;
use crate::foundation::math::{
    safe_normalize, transform_point, transform_vector, zero_direction, Mat4, Vec3,
};
use crate::geom::{Aabb, Obb, Sphere, Triangle};

use super::bvh::Bvh;

/// Largest number of triangles stored in one BVH leaf
const MAX_LEAF_TRIANGLES: usize = 32;

/// Hit capacity of a [`RaycastResult`]
pub const MAX_RAYCAST_HITS: usize = 32;

/// Hit capacity of a [`PushOutInfo`]
pub const MAX_PUSH_OUT_HITS: usize = 8;

/// A triangle stored as three indices into the mesh vertex array
#[derive(Debug, Clone, Copy)]
pub struct MeshTriangle {
    /// Vertex indices, counterclockwise for a front face
    pub indices: [u32; 3],
}

/// BVH leaf payload: a contiguous run of mesh triangles
#[derive(Debug, Clone, Copy)]
pub struct TriangleRun {
    /// First triangle index
    pub start: u32,
    /// Number of triangles in the run
    pub count: u32,
}

/// Index buffer views accepted by [`CollisionMesh::load`]
#[derive(Debug, Clone, Copy)]
pub enum MeshIndices<'a> {
    /// 16-bit indices
    U16(&'a [u16]),
    /// 32-bit indices
    U32(&'a [u32]),
}

impl MeshIndices<'_> {
    /// Number of indices in the buffer
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::U16(slice) => slice.len(),
            Self::U32(slice) => slice.len(),
        }
    }

    /// True when the buffer holds no indices
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, i: usize) -> u32 {
        match self {
            Self::U16(slice) => u32::from(slice[i]),
            Self::U32(slice) => slice[i],
        }
    }
}

/// Read positions out of a raw vertex buffer
///
/// `stride` is the byte distance between consecutive vertices; the first
/// 12 bytes of each vertex must be three little-endian `f32` coordinates.
///
/// # Panics
/// Panics if `stride < 12`.
#[must_use]
pub fn positions_from_bytes(data: &[u8], stride: usize) -> Vec<Vec3> {
    assert!(stride >= 12, "vertex stride {stride} smaller than a position");
    let mut positions = Vec::with_capacity(data.len() / stride);
    let mut offset = 0;
    while offset + 12 <= data.len() {
        let xyz: [f32; 3] = bytemuck::pod_read_unaligned(&data[offset..offset + 12]);
        positions.push(Vec3::new(xyz[0], xyz[1], xyz[2]));
        offset += stride;
    }
    positions
}

/// Geometry passed to [`CollisionMesh::load`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadParams<'a> {
    /// Vertex positions; must not be empty
    pub positions: &'a [Vec3],
    /// Triangle indices; `None` treats `positions` as a triangle list
    pub indices: Option<MeshIndices<'a>>,
    /// Applied to incoming positions before they are stored
    pub transform: Option<Mat4>,
}

/// Parameters for [`CollisionMesh::raycast`]
#[derive(Debug, Clone, Copy)]
pub struct RaycastParams {
    /// World transform of the mesh
    pub transform: Mat4,
    /// Ray origin in world space
    pub source: Vec3,
    /// Ray direction; need not be normalized
    pub direction: Vec3,
    /// Maximum hit distance; `0.0` for an unlimited ray
    pub max_length: f32,
    /// Hits kept after sorting by distance; `0` skips the query entirely
    pub max_hits: u32,
    /// Hit front (counterclockwise-wound) faces
    pub hit_counterclockwise: bool,
    /// Hit back (clockwise-wound) faces
    pub hit_clockwise: bool,
    /// Caller tag copied into every hit, identifying the mesh among many
    pub user_id: u64,
}

impl Default for RaycastParams {
    fn default() -> Self {
        Self {
            transform: Mat4::identity(),
            source: Vec3::zeros(),
            direction: Vec3::new(0.0, 0.0, -1.0),
            max_length: 0.0,
            max_hits: MAX_RAYCAST_HITS as u32,
            hit_counterclockwise: true,
            hit_clockwise: false,
            user_id: 0,
        }
    }
}

/// A single raycast hit in world space
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaycastHit {
    /// Hit point
    pub position: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Distance from the source along the normalized direction
    pub distance: f32,
    /// The `user_id` of the originating query
    pub user_id: u64,
}

/// Accumulated raycast hits, closest first
#[derive(Debug, Clone)]
pub struct RaycastResult {
    /// Hits sorted by distance, at most [`MAX_RAYCAST_HITS`]
    pub hits: Array<RaycastHit>,
}

impl Default for RaycastResult {
    fn default() -> Self {
        Self {
            hits: Array::bounded(MAX_RAYCAST_HITS),
        }
    }
}

/// Parameters for [`CollisionMesh::push_out`]
#[derive(Debug, Clone, Copy)]
pub struct PushOutParams {
    /// World transform of the mesh
    pub transform: Mat4,
}

impl Default for PushOutParams {
    fn default() -> Self {
        Self {
            transform: Mat4::identity(),
        }
    }
}

/// A single push-out contact
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PushOutHit {
    /// Contact point on the triangle surface
    pub position: Vec3,
    /// Triangle face normal
    pub normal: Vec3,
}

/// Sphere state threaded through [`CollisionMesh::push_out`] calls
///
/// The same value is passed through push-out against several meshes in
/// turn; each call returns an updated copy (or the input unchanged when the
/// mesh was not near).
#[derive(Debug, Clone)]
pub struct PushOutInfo {
    /// Current sphere position and radius
    pub sphere: Sphere,
    /// Current velocity; components pushing into hit faces are zeroed
    pub velocity: Vec3,
    /// Recorded contacts, first-found up to [`MAX_PUSH_OUT_HITS`]
    pub hits: Array<PushOutHit>,
}

impl PushOutInfo {
    /// Start a push-out pass for `sphere` moving with `velocity`
    #[must_use]
    pub fn new(sphere: Sphere, velocity: Vec3) -> Self {
        Self {
            sphere,
            velocity,
            hits: Array::bounded(MAX_PUSH_OUT_HITS),
        }
    }
}

/// Receiver for debug visualization during queries
///
/// Purely observational: implementations draw the shapes the traversal
/// touches and have no effect on query results.
pub trait DebugDraw {
    /// A line segment
    fn add_line(&mut self, p0: Vec3, p1: Vec3);
    /// An oriented box given as a centered-unit-cube transform
    fn add_obb(&mut self, transform: Mat4);
    /// A circle around `center` facing `normal`
    fn add_circle(&mut self, center: Vec3, normal: Vec3, radius: f32);
    /// A sphere
    fn add_sphere(&mut self, center: Vec3, radius: f32);
}

/// Static triangle geometry with per-load BVH acceleration
///
/// Grown by repeated [`load`](CollisionMesh::load) calls, cleared with
/// [`clear`](CollisionMesh::clear), and queried through
/// [`raycast`](CollisionMesh::raycast) and
/// [`push_out`](CollisionMesh::push_out), which never mutate mesh data.
#[derive(Debug, Clone, Default)]
pub struct CollisionMesh {
    vertices: Array<Vec3>,
    triangles: Array<MeshTriangle>,
    trees: Array<Bvh<TriangleRun>>,
    aabb: Aabb,
}

impl CollisionMesh {
    /// Create an empty mesh
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append geometry and build one BVH over it
    ///
    /// Incoming positions are transformed by `params.transform` (when
    /// given) before storage; triangle indices are re-based onto the
    /// existing vertex array. BVHs built by earlier loads are untouched.
    ///
    /// # Panics
    /// Panics if `positions` is empty, an index count is not a multiple of
    /// three, or an index is out of range.
    pub fn load(&mut self, params: LoadParams) {
        assert!(
            !params.positions.is_empty(),
            "collision mesh load requires positions"
        );

        let vertex_base = self.vertices.len() as u32;
        let mut chunk_aabb = Aabb::default();
        self.vertices.reserve(self.vertices.len() + params.positions.len());
        for &position in params.positions {
            let position = params
                .transform
                .map_or(position, |m| transform_point(&m, position));
            chunk_aabb.expand(position);
            self.vertices.push(position);
        }
        self.aabb = self.aabb.union(&chunk_aabb);

        let tri_base = self.triangles.len();
        if let Some(indices) = params.indices {
            assert!(
                indices.len() % 3 == 0,
                "index count {} is not a multiple of 3",
                indices.len()
            );
            for tri in 0..indices.len() / 3 {
                let mut resolved = [0u32; 3];
                for (corner, slot) in resolved.iter_mut().enumerate() {
                    let index = indices.get(tri * 3 + corner);
                    assert!(
                        (index as usize) < params.positions.len(),
                        "triangle index {index} out of range"
                    );
                    *slot = vertex_base + index;
                }
                self.triangles.push(MeshTriangle { indices: resolved });
            }
        } else {
            assert!(
                params.positions.len() % 3 == 0,
                "triangle list vertex count {} is not a multiple of 3",
                params.positions.len()
            );
            for tri in 0..params.positions.len() / 3 {
                let first = vertex_base + (tri * 3) as u32;
                self.triangles.push(MeshTriangle {
                    indices: [first, first + 1, first + 2],
                });
            }
        }

        // Each load gets its own tree over just the new triangles, rooted at
        // the running whole-mesh bounds
        let mut bvh = Bvh::new();
        let root = bvh.add_root(self.aabb);
        let vertices = self.vertices.as_slice();
        let new_triangles = &mut self.triangles.as_mut_slice()[tri_base..];
        build_subtree(&mut bvh, root, vertices, new_triangles, tri_base as u32);

        debug!(
            "collision mesh load: {} vertices, {} triangles, bvh with {} nodes / {} leaves",
            params.positions.len(),
            new_triangles.len(),
            bvh.node_count(),
            bvh.leaf_count()
        );
        self.trees.push(bvh);
    }

    /// Drop all geometry and acceleration structures
    ///
    /// Idempotent: clearing an already-empty mesh is a no-op.
    pub fn clear(&mut self) {
        debug!(
            "collision mesh clear: dropping {} vertices, {} triangles, {} trees",
            self.vertices.len(),
            self.triangles.len(),
            self.trees.len()
        );
        self.vertices.clear();
        self.triangles.clear();
        self.trees.clear();
        self.aabb = Aabb::default();
    }

    /// Number of stored vertices
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of stored triangles
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of BVH trees (one per load)
    #[must_use]
    pub fn bvh_count(&self) -> usize {
        self.trees.len()
    }

    /// Bounds covering all loaded geometry
    ///
    /// Inverted-infinite while the mesh is empty.
    #[must_use]
    pub const fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Stored vertex positions
    #[must_use]
    pub fn vertices(&self) -> &[Vec3] {
        self.vertices.as_slice()
    }

    /// Corner positions of triangle `index`
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let tri = &self.triangles[index];
        [
            self.vertices[tri.indices[0] as usize],
            self.vertices[tri.indices[1] as usize],
            self.vertices[tri.indices[2] as usize],
        ]
    }

    /// Cast a ray against the mesh, merging hits into `prev`
    ///
    /// Hits from this mesh and `prev` are sorted together by distance and
    /// truncated to `params.max_hits`; with `max_hits == 0` the query is
    /// skipped and `prev` comes back untouched. A miss likewise returns
    /// `prev` unchanged.
    #[must_use]
    pub fn raycast(&self, params: &RaycastParams, prev: RaycastResult) -> RaycastResult {
        self.raycast_impl(params, prev, None)
    }

    /// [`raycast`](CollisionMesh::raycast) with debug visualization
    #[must_use]
    pub fn raycast_debug(
        &self,
        params: &RaycastParams,
        prev: RaycastResult,
        debug: &mut dyn DebugDraw,
    ) -> RaycastResult {
        self.raycast_impl(params, prev, Some(debug))
    }

    fn raycast_impl(
        &self,
        params: &RaycastParams,
        prev: RaycastResult,
        mut debug: Option<&mut dyn DebugDraw>,
    ) -> RaycastResult {
        if params.max_hits == 0 || params.max_length < 0.0 || !self.aabb.is_valid() {
            return prev;
        }

        // Whole-mesh early out in world space
        let obb = Obb::from_transform(&(params.transform * self.aabb.to_transform()));
        if obb.intersect_ray(params.source, params.direction).is_none() {
            return prev;
        }
        if let Some(draw) = debug.as_deref_mut() {
            draw.add_obb(obb.to_transform());
        }

        let limit_ray = params.max_length != 0.0;
        let Some(inverse) = params.transform.try_inverse() else {
            panic!("raycast transform is not invertible");
        };
        let world_ray = if limit_ray {
            safe_normalize(params.direction) * params.max_length
        } else {
            params.direction
        };
        let local_source = transform_point(&inverse, params.source);
        let local_ray = transform_vector(&inverse, world_ray);
        let world_dir = safe_normalize(params.direction);

        let mut hits: Vec<RaycastHit> = Vec::new();
        let mut stack: Vec<u32> = Vec::new();
        for tree in &self.trees {
            stack.push(0);
            while let Some(index) = stack.pop() {
                let node = tree.node(index);
                if node.aabb.intersect_ray(local_source, local_ray).is_none() {
                    continue;
                }
                if let Some(leaf) = node.leaf {
                    let run = tree.leaf(leaf);
                    for tri in run.start..run.start + run.count {
                        let [a, b, c] = self.triangle(tri as usize);
                        let Some(hit) = Triangle::new(a, b, c).intersect_ray_filtered(
                            local_source,
                            local_ray,
                            limit_ray,
                            params.hit_counterclockwise,
                            params.hit_clockwise,
                        ) else {
                            continue;
                        };
                        let position = transform_point(&params.transform, hit.point);
                        let normal =
                            safe_normalize(transform_vector(&params.transform, hit.normal));
                        // Distance measured in world space because the
                        // transform may carry non-uniform scale
                        hits.push(RaycastHit {
                            position,
                            normal,
                            distance: world_dir.dot(&(position - params.source)),
                            user_id: params.user_id,
                        });
                    }
                }
                if let Some((left, right)) = node.children {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }

        if let Some(draw) = debug.as_deref_mut() {
            draw.add_line(params.source, params.source + world_ray);
            for hit in &hits {
                draw.add_circle(hit.position, hit.normal, 0.25);
                draw.add_line(hit.position, hit.position + hit.normal);
            }
        }

        hits.extend(prev.hits.iter().copied());
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate((params.max_hits as usize).min(MAX_RAYCAST_HITS));

        let mut result = RaycastResult::default();
        for hit in hits {
            result.hits.push(hit);
        }
        result
    }

    /// Push a sphere out of the mesh, updating `prev`
    ///
    /// On contact the sphere center is displaced along the separation
    /// vector and the velocity component into each hit face is zeroed.
    /// Contacts are recorded first-found until the bounded hit array fills;
    /// later contacts still move the sphere but are not recorded. Returns
    /// `prev` unchanged when the mesh is too far from the sphere.
    #[must_use]
    pub fn push_out(&self, params: &PushOutParams, prev: PushOutInfo) -> PushOutInfo {
        self.push_out_impl(params, prev, None)
    }

    /// [`push_out`](CollisionMesh::push_out) with debug visualization
    #[must_use]
    pub fn push_out_debug(
        &self,
        params: &PushOutParams,
        prev: PushOutInfo,
        debug: &mut dyn DebugDraw,
    ) -> PushOutInfo {
        self.push_out_impl(params, prev, Some(debug))
    }

    fn push_out_impl(
        &self,
        params: &PushOutParams,
        prev: PushOutInfo,
        mut debug: Option<&mut dyn DebugDraw>,
    ) -> PushOutInfo {
        if !self.aabb.is_valid() {
            return prev;
        }
        let obb = Obb::from_transform(&(params.transform * self.aabb.to_transform()));
        if obb.min_distance(prev.sphere.center) > prev.sphere.radius {
            return prev;
        }
        if let Some(draw) = debug.as_deref_mut() {
            draw.add_obb(obb.to_transform());
        }

        let identity = params.transform == Mat4::identity();
        let inverse = if identity {
            Mat4::identity()
        } else {
            let Some(inverse) = params.transform.try_inverse() else {
                panic!("push-out transform is not invertible");
            };
            inverse
        };
        // Conservative local-space prune radius: correct for rigid
        // transforms, never prunes a real contact under non-uniform scale
        let local_radius = if identity {
            prev.sphere.radius
        } else {
            prev.sphere.radius / min_column_scale(&params.transform)
        };

        let mut result = PushOutInfo {
            sphere: prev.sphere,
            velocity: prev.velocity,
            hits: Array::bounded(MAX_PUSH_OUT_HITS),
        };

        let mut stack: Vec<u32> = Vec::new();
        for tree in &self.trees {
            stack.push(0);
            while let Some(index) = stack.pop() {
                // Re-derive the local center each node: earlier contacts
                // may already have moved the sphere
                let local_center = if identity {
                    result.sphere.center
                } else {
                    transform_point(&inverse, result.sphere.center)
                };
                let node = tree.node(index);
                if node.aabb.distance_to_point(local_center) > local_radius {
                    continue;
                }
                if let Some(leaf) = node.leaf {
                    let run = tree.leaf(leaf);
                    for tri in run.start..run.start + run.count {
                        let [a, b, c] = self.triangle(tri as usize);
                        let triangle = if identity {
                            Triangle::new(a, b, c)
                        } else {
                            Triangle::new(
                                transform_point(&params.transform, a),
                                transform_point(&params.transform, b),
                                transform_point(&params.transform, c),
                            )
                        };
                        push_out_triangle(&triangle, &mut result, debug.as_deref_mut());
                    }
                }
                if let Some((left, right)) = node.children {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }

        if result.hits.is_empty() {
            return prev;
        }
        // Carry earlier contacts forward while the bounded array has room
        for hit in prev.hits.iter() {
            if result.hits.try_push(*hit).is_err() {
                break;
            }
        }
        result
    }
}

/// Test one world-space triangle against the sphere and respond
fn push_out_triangle(
    triangle: &Triangle,
    result: &mut PushOutInfo,
    mut debug: Option<&mut (dyn DebugDraw + '_)>,
) {
    let normal = triangle.normal();

    // Only faces the sphere is in front of can push it
    if normal.dot(&(result.sphere.center - triangle.centroid())) < 0.0 {
        return;
    }

    let Some(contact) = result.sphere.intersect_triangle(triangle) else {
        return;
    };
    if normal.dot(&(result.sphere.center - contact)) < 0.0 {
        return;
    }

    let closest_sphere_point = result.sphere.center
        + safe_normalize(contact - result.sphere.center) * result.sphere.radius;
    result.sphere.center += contact - closest_sphere_point;
    result.velocity = zero_direction(result.velocity, -normal);

    // Bounded accumulation: once full, further contacts still move the
    // sphere but go unrecorded (no nearest-K selection)
    let _ = result.hits.try_push(PushOutHit {
        position: contact,
        normal,
    });

    if let Some(draw) = debug.as_deref_mut() {
        draw.add_line(triangle.v0, triangle.v1);
        draw.add_line(triangle.v1, triangle.v2);
        draw.add_line(triangle.v2, triangle.v0);
        draw.add_line(contact, contact + normal * 2.0);
        draw.add_sphere(contact, 0.05);
    }
}

/// Smallest column scale of a transform's linear part
fn min_column_scale(m: &Mat4) -> f32 {
    let mut smallest = f32::INFINITY;
    for i in 0..3 {
        let column = Vec3::new(m[(0, i)], m[(1, i)], m[(2, i)]);
        smallest = smallest.min(column.magnitude());
    }
    smallest.max(f32::EPSILON)
}

/// Recursively partition `triangles` under `node` by the longest axis
///
/// `first` is the absolute index of `triangles[0]` in the mesh triangle
/// array; leaves record absolute runs. A partition that fails to separate
/// the set (every triangle on one side) terminates in a single leaf.
fn build_subtree(
    bvh: &mut Bvh<TriangleRun>,
    node: u32,
    vertices: &[Vec3],
    triangles: &mut [MeshTriangle],
    first: u32,
) {
    if triangles.len() <= MAX_LEAF_TRIANGLES {
        bvh.set_leaf(
            node,
            TriangleRun {
                start: first,
                count: triangles.len() as u32,
            },
        );
        return;
    }

    let bounds = bvh.node(node).aabb;
    let axis = bounds.longest_axis();
    let pivot = bounds.center()[axis];

    let mut left_aabb = Aabb::default();
    let mut right_aabb = Aabb::default();
    let mut split = 0usize;
    for i in 0..triangles.len() {
        let tri = triangles[i];
        // Per-vertex signed distance to the splitting plane; the side whose
        // farthest vertex wins takes the triangle
        let mut farthest_left = 0.0f32;
        let mut farthest_right = 0.0f32;
        for &vertex in &tri.indices {
            let distance = vertices[vertex as usize][axis] - pivot;
            farthest_right = farthest_right.max(distance);
            farthest_left = farthest_left.max(-distance);
        }
        if farthest_left >= farthest_right {
            for &vertex in &tri.indices {
                left_aabb.expand(vertices[vertex as usize]);
            }
            triangles.swap(i, split);
            split += 1;
        } else {
            for &vertex in &tri.indices {
                right_aabb.expand(vertices[vertex as usize]);
            }
        }
    }

    if split == 0 || split == triangles.len() {
        // Degenerate split: everything became one side
        bvh.set_leaf(
            node,
            TriangleRun {
                start: first,
                count: triangles.len() as u32,
            },
        );
        return;
    }

    let (left, right) = bvh.add_children(node, left_aabb, right_aabb);
    let (left_triangles, right_triangles) = triangles.split_at_mut(split);
    build_subtree(bvh, left, vertices, left_triangles, first);
    build_subtree(bvh, right, vertices, right_triangles, first + split as u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit quad in the XY plane, normal +Z, counterclockwise winding
    fn quad_mesh() -> CollisionMesh {
        let mut mesh = CollisionMesh::new();
        mesh.load(LoadParams {
            positions: &[
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            indices: Some(MeshIndices::U16(&[0, 1, 2, 0, 2, 3])),
            transform: None,
        });
        mesh
    }

    #[test]
    fn quad_raycast_is_deterministic() {
        let mesh = quad_mesh();
        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(0.0, 0.0, 5.0),
                direction: Vec3::new(0.0, 0.0, -1.0),
                max_hits: 1,
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );

        assert_eq!(result.hits.len(), 1);
        let hit = result.hits[0];
        assert_relative_eq!(hit.position.x, 0.0);
        assert_relative_eq!(hit.position.y, 0.0);
        assert_relative_eq!(hit.position.z, 0.0);
        assert_relative_eq!(hit.normal.z, 1.0);
        assert_relative_eq!(hit.distance, 5.0);
    }

    #[test]
    fn raycast_miss_returns_prev_unchanged() {
        let mesh = quad_mesh();
        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(10.0, 10.0, 5.0),
                direction: Vec3::new(0.0, 0.0, -1.0),
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert!(result.hits.is_empty());
    }

    #[test]
    fn raycast_zero_max_hits_skips_traversal() {
        let mesh = quad_mesh();
        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(0.0, 0.0, 5.0),
                direction: Vec3::new(0.0, 0.0, -1.0),
                max_hits: 0,
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert!(result.hits.is_empty());
    }

    #[test]
    fn raycast_respects_winding_filters() {
        let mesh = quad_mesh();
        // From behind with only counterclockwise hits enabled: nothing
        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(0.2, 0.0, -5.0),
                direction: Vec3::new(0.0, 0.0, 1.0),
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert!(result.hits.is_empty());

        // Allowing clockwise hits sees the back face
        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(0.2, 0.0, -5.0),
                direction: Vec3::new(0.0, 0.0, 1.0),
                hit_counterclockwise: false,
                hit_clockwise: true,
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert_eq!(result.hits.len(), 1);
        assert_relative_eq!(result.hits[0].distance, 5.0);
    }

    #[test]
    fn raycast_max_length_limits_the_ray() {
        let mesh = quad_mesh();
        let params = RaycastParams {
            source: Vec3::new(0.2, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            max_length: 4.0,
            ..RaycastParams::default()
        };
        let result = mesh.raycast(&params, RaycastResult::default());
        assert!(result.hits.is_empty());

        let result = mesh.raycast(
            &RaycastParams {
                max_length: 6.0,
                ..params
            },
            RaycastResult::default(),
        );
        assert_eq!(result.hits.len(), 1);
    }

    #[test]
    fn raycast_merges_and_sorts_previous_hits() {
        let mesh = quad_mesh();
        // A second mesh one unit above the first
        let mut upper = CollisionMesh::new();
        upper.load(LoadParams {
            positions: &[
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
            indices: Some(MeshIndices::U16(&[0, 1, 2, 0, 2, 3])),
            transform: None,
        });

        let params = RaycastParams {
            source: Vec3::new(0.2, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            user_id: 1,
            ..RaycastParams::default()
        };
        let first = mesh.raycast(&params, RaycastResult::default());
        let merged = upper.raycast(
            &RaycastParams {
                user_id: 2,
                ..params
            },
            first,
        );

        assert_eq!(merged.hits.len(), 2);
        assert!(merged.hits[0].distance < merged.hits[1].distance);
        assert_eq!(merged.hits[0].user_id, 2);
        assert_eq!(merged.hits[1].user_id, 1);
    }

    #[test]
    fn raycast_applies_mesh_transform() {
        let mesh = quad_mesh();
        // Mesh raised 2 units in world space
        let result = mesh.raycast(
            &RaycastParams {
                transform: Mat4::new_translation(&Vec3::new(0.0, 0.0, 2.0)),
                source: Vec3::new(0.2, 0.0, 5.0),
                direction: Vec3::new(0.0, 0.0, -1.0),
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert_eq!(result.hits.len(), 1);
        assert_relative_eq!(result.hits[0].position.z, 2.0);
        assert_relative_eq!(result.hits[0].distance, 3.0);
    }

    #[test]
    fn quad_push_out_moves_sphere_to_surface() {
        let mesh = quad_mesh();
        let info = mesh.push_out(
            &PushOutParams::default(),
            PushOutInfo::new(
                Sphere::new(Vec3::new(0.0, 0.0, 0.5), 1.0),
                Vec3::new(1.0, 0.0, -3.0),
            ),
        );

        assert!(!info.hits.is_empty());
        assert_relative_eq!(info.sphere.center.x, 0.0);
        assert_relative_eq!(info.sphere.center.y, 0.0);
        assert_relative_eq!(info.sphere.center.z, 1.0, epsilon = 1e-5);
        // Downward component zeroed, lateral kept
        assert_relative_eq!(info.velocity.z, 0.0);
        assert_relative_eq!(info.velocity.x, 1.0);
    }

    #[test]
    fn push_out_under_translated_transform() {
        let mesh = quad_mesh();
        // Quad raised to the z = 2 plane in world space
        let info = mesh.push_out(
            &PushOutParams {
                transform: Mat4::new_translation(&Vec3::new(0.0, 0.0, 2.0)),
            },
            PushOutInfo::new(
                Sphere::new(Vec3::new(0.0, 0.0, 2.5), 1.0),
                Vec3::new(0.0, 1.0, -2.0),
            ),
        );

        assert!(!info.hits.is_empty());
        assert_relative_eq!(info.hits[0].position.z, 2.0, epsilon = 1e-5);
        assert_relative_eq!(info.sphere.center.z, 3.0, epsilon = 1e-5);
        assert_relative_eq!(info.velocity.z, 0.0);
        assert_relative_eq!(info.velocity.y, 1.0);
    }

    #[test]
    fn push_out_under_nonuniform_scale() {
        let mesh = quad_mesh();
        // Stretched in x/y, squashed in z; the plane itself stays at z = 0
        let info = mesh.push_out(
            &PushOutParams {
                transform: Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 2.0, 0.5)),
            },
            PushOutInfo::new(
                Sphere::new(Vec3::new(0.0, 0.0, 0.5), 1.0),
                Vec3::new(1.0, 0.0, -3.0),
            ),
        );

        assert!(!info.hits.is_empty());
        assert_relative_eq!(info.sphere.center.z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(info.velocity.z, 0.0);
        assert_relative_eq!(info.velocity.x, 1.0);
    }

    #[test]
    fn push_out_hit_buffer_caps_while_later_contacts_still_respond() {
        // A fan of twelve floor triangles sharing the origin vertex, plus one
        // wall triangle in the x = 0.5 plane tested after all of them
        let mut positions = vec![Vec3::zeros()];
        for i in 0..=12u32 {
            let angle = i as f32 / 12.0 * std::f32::consts::TAU;
            positions.push(Vec3::new(angle.cos(), angle.sin(), 0.0));
        }
        let mut indices: Vec<u32> = Vec::new();
        for i in 0..12u32 {
            indices.extend_from_slice(&[0, i + 1, i + 2]);
        }
        let wall = positions.len() as u32;
        positions.push(Vec3::new(0.5, -2.0, 0.0));
        positions.push(Vec3::new(0.5, 0.0, 3.0));
        positions.push(Vec3::new(0.5, 2.0, 0.0));
        indices.extend_from_slice(&[wall, wall + 1, wall + 2]);

        let mut mesh = CollisionMesh::new();
        mesh.load(LoadParams {
            positions: &positions,
            indices: Some(MeshIndices::U32(&indices)),
            transform: None,
        });
        assert_eq!(mesh.triangle_count(), 13);

        let info = mesh.push_out(
            &PushOutParams::default(),
            PushOutInfo::new(
                Sphere::new(Vec3::new(0.0, 0.0, 0.5), 1.0),
                Vec3::new(1.0, 0.0, -3.0),
            ),
        );

        // Twelve floor contacts overflow the bounded hit array
        assert_eq!(info.hits.len(), MAX_PUSH_OUT_HITS);
        // The floor lifted the sphere, and the wall still displaced it along
        // -x even though its contact went unrecorded
        assert_relative_eq!(info.sphere.center.z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(info.sphere.center.x, -0.5, epsilon = 1e-5);
        assert_relative_eq!(info.velocity.z, 0.0);
        assert_relative_eq!(info.velocity.x, 0.0);
    }

    #[test]
    fn push_out_folds_previous_hits_up_to_capacity() {
        let mesh = quad_mesh();
        let mut prev = PushOutInfo::new(
            Sphere::new(Vec3::new(0.2, 0.0, 0.5), 1.0),
            Vec3::zeros(),
        );
        for i in 0..MAX_PUSH_OUT_HITS {
            prev.hits.push(PushOutHit {
                position: Vec3::new(i as f32, 0.0, -1.0),
                normal: Vec3::new(0.0, 0.0, 1.0),
            });
        }

        let info = mesh.push_out(&PushOutParams::default(), prev);

        // One fresh contact, then earlier hits fold in until the array fills
        assert_eq!(info.hits.len(), MAX_PUSH_OUT_HITS);
        assert_relative_eq!(info.hits[0].position.z, 0.0);
        assert_relative_eq!(info.hits[1].position.z, -1.0);
        assert_relative_eq!(info.sphere.center.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn push_out_far_sphere_returns_prev() {
        let mesh = quad_mesh();
        let prev = PushOutInfo::new(
            Sphere::new(Vec3::new(50.0, 0.0, 0.0), 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        );
        let info = mesh.push_out(&PushOutParams::default(), prev);
        assert_relative_eq!(info.sphere.center.x, 50.0);
        assert!(info.hits.is_empty());
        assert_relative_eq!(info.velocity.z, -1.0);
    }

    #[test]
    fn multiple_loads_build_independent_trees() {
        let mut mesh = quad_mesh();
        assert_eq!(mesh.bvh_count(), 1);

        // Second load: same quad raised 3 units via transform
        mesh.load(LoadParams {
            positions: &[
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            indices: Some(MeshIndices::U32(&[0, 1, 2, 0, 2, 3])),
            transform: Some(Mat4::new_translation(&Vec3::new(0.0, 0.0, 3.0))),
        });
        assert_eq!(mesh.bvh_count(), 2);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 4);
        assert_relative_eq!(mesh.aabb().max.z, 3.0);

        // One ray sees geometry from both loads
        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(0.2, 0.0, 5.0),
                direction: Vec3::new(0.0, 0.0, -1.0),
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert_eq!(result.hits.len(), 2);
        assert_relative_eq!(result.hits[0].position.z, 3.0);
        assert_relative_eq!(result.hits[1].position.z, 0.0);
    }

    #[test]
    fn triangle_list_without_indices() {
        let mut mesh = CollisionMesh::new();
        mesh.load(LoadParams {
            positions: &[
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            indices: None,
            transform: None,
        });
        assert_eq!(mesh.triangle_count(), 1);

        let result = mesh.raycast(
            &RaycastParams {
                source: Vec3::new(0.0, 0.0, 2.0),
                direction: Vec3::new(0.0, 0.0, -1.0),
                ..RaycastParams::default()
            },
            RaycastResult::default(),
        );
        assert_eq!(result.hits.len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut mesh = CollisionMesh::new();
        mesh.clear();
        assert_eq!(mesh.vertex_count(), 0);
        assert!(!mesh.aabb().is_valid());

        mesh.load(LoadParams {
            positions: &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            indices: None,
            transform: None,
        });
        mesh.clear();
        mesh.clear();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert_eq!(mesh.bvh_count(), 0);
        assert!(!mesh.aabb().is_valid());
    }

    #[test]
    fn large_mesh_builds_multi_level_tree_and_hits_correctly() {
        // A 20x20 grid of quads in the XY plane forces real partitioning
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        for y in 0..20u32 {
            for x in 0..20u32 {
                let base = positions.len() as u32;
                let (fx, fy) = (x as f32, y as f32);
                positions.push(Vec3::new(fx, fy, 0.0));
                positions.push(Vec3::new(fx + 1.0, fy, 0.0));
                positions.push(Vec3::new(fx + 1.0, fy + 1.0, 0.0));
                positions.push(Vec3::new(fx, fy + 1.0, 0.0));
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
        }
        let mut mesh = CollisionMesh::new();
        mesh.load(LoadParams {
            positions: &positions,
            indices: Some(MeshIndices::U32(&indices)),
            transform: None,
        });
        assert_eq!(mesh.triangle_count(), 800);

        let tree = mesh.trees.iter().next().unwrap();
        assert!(tree.node_count() > 1, "800 triangles must subdivide");
        for node in tree.nodes() {
            assert!(!(node.children.is_some() && node.leaf.is_some()));
        }

        // Every leaf triangle is reachable exactly once through the runs
        let mut covered = vec![false; mesh.triangle_count()];
        for node in tree.nodes() {
            let Some(leaf) = node.leaf else { continue };
            let run = tree.leaf(leaf);
            for tri in run.start..run.start + run.count {
                assert!(!covered[tri as usize], "triangle in two leaves");
                covered[tri as usize] = true;
            }
        }
        assert!(covered.iter().all(|&c| c));

        // Rays into a few cells all land on the plane
        for (sx, sy) in [(0.3f32, 0.4f32), (10.5, 7.5), (19.5, 19.5)] {
            let result = mesh.raycast(
                &RaycastParams {
                    source: Vec3::new(sx, sy, 3.0),
                    direction: Vec3::new(0.0, 0.0, -1.0),
                    max_hits: 1,
                    ..RaycastParams::default()
                },
                RaycastResult::default(),
            );
            assert_eq!(result.hits.len(), 1, "miss at ({sx}, {sy})");
            assert_relative_eq!(result.hits[0].position.z, 0.0);
            assert_relative_eq!(result.hits[0].distance, 3.0);
        }
    }

    #[test]
    fn positions_from_bytes_honors_stride() {
        // Two vertices with 4 bytes of padding between them
        let mut data = Vec::new();
        for value in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&[0xff; 4]);
        for value in [4.0f32, 5.0, 6.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&[0xff; 4]);

        let positions = positions_from_bytes(&data, 16);
        assert_eq!(positions.len(), 2);
        assert_relative_eq!(positions[0].z, 3.0);
        assert_relative_eq!(positions[1].x, 4.0);
    }

    struct RecordingDraw {
        lines: usize,
        obbs: usize,
    }

    impl DebugDraw for RecordingDraw {
        fn add_line(&mut self, _p0: Vec3, _p1: Vec3) {
            self.lines += 1;
        }
        fn add_obb(&mut self, _transform: Mat4) {
            self.obbs += 1;
        }
        fn add_circle(&mut self, _center: Vec3, _normal: Vec3, _radius: f32) {}
        fn add_sphere(&mut self, _center: Vec3, _radius: f32) {}
    }

    #[test]
    fn debug_hook_observes_without_changing_results() {
        let mesh = quad_mesh();
        let params = RaycastParams {
            source: Vec3::new(0.2, 0.0, 5.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            ..RaycastParams::default()
        };
        let plain = mesh.raycast(&params, RaycastResult::default());

        let mut draw = RecordingDraw { lines: 0, obbs: 0 };
        let observed = mesh.raycast_debug(&params, RaycastResult::default(), &mut draw);

        assert_eq!(plain.hits.len(), observed.hits.len());
        assert_eq!(draw.obbs, 1);
        assert!(draw.lines > 0);
    }
}
