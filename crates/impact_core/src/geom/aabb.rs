//! Axis-aligned bounding box

use crate::foundation::math::{Mat4, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
///
/// The default box is inverted-infinite (`min = +inf`, `max = -inf`): it
/// contains nothing, and expanding it by the first point snaps it to that
/// point. This is the running-bounds representation `CollisionMesh` keeps
/// across `load` calls.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }
}

impl Aabb {
    /// Create a new AABB from min and max points
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB containing a single point
    #[must_use]
    pub const fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Create an AABB centered at a point with given extents (half-size)
    #[must_use]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// True when the box contains at least one point
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Get the center of the AABB
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Get the full size of the AABB
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Axis index (0 = x, 1 = y, 2 = z) of the widest dimension
    #[must_use]
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Widen the box to contain `point`
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// The smallest box containing both `self` and `other`
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Check if this AABB contains a point
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Test ray intersection with this AABB using the slab method
    ///
    /// `ray_dir` may be any length; the returned distance is in units of
    /// `ray_dir`. Returns the entry distance (clamped to zero when the
    /// origin is inside), or `None` on a miss.
    #[must_use]
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x == 0.0 { f32::INFINITY } else { 1.0 / ray_dir.x },
            if ray_dir.y == 0.0 { f32::INFINITY } else { 1.0 / ray_dir.y },
            if ray_dir.z == 0.0 { f32::INFINITY } else { 1.0 / ray_dir.z },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        // Ray intersects if tmax >= tmin and tmax >= 0
        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }

    /// Distance from `point` to the box surface (zero inside)
    #[must_use]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.distance_squared_to_point(point).sqrt()
    }

    /// Squared distance from `point` to the box surface (zero inside)
    #[must_use]
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        let closest = Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        );
        (point - closest).magnitude_squared()
    }

    /// Matrix mapping the centered unit cube onto this box
    ///
    /// Composing with a world transform yields the oriented box
    /// ([`Obb`](super::Obb)) used for whole-mesh early-out tests.
    #[must_use]
    pub fn to_transform(&self) -> Mat4 {
        let size = self.size();
        Mat4::new_translation(&self.center())
            * Mat4::new_nonuniform_scaling(&Vec3::new(size.x, size.y, size.z))
    }
}
