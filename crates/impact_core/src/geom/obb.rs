//! Oriented bounding box

use crate::foundation::math::{Mat4, Vec3};

use super::Aabb;

/// Oriented bounding box
///
/// Constructed from a matrix mapping the centered unit cube into world
/// space, typically `world_transform * aabb.to_transform()`. Used by the
/// mesh queries as a coarse early-out before any tree traversal.
#[derive(Debug, Clone, Copy)]
pub struct Obb {
    center: Vec3,
    axes: [Vec3; 3],
    half_size: Vec3,
}

impl Obb {
    /// Build from a matrix mapping the centered unit cube `[-0.5, 0.5]^3`
    ///
    /// Degenerate (zero-scale) axes collapse the box flat along that
    /// direction.
    #[must_use]
    pub fn from_transform(transform: &Mat4) -> Self {
        let column = |i: usize| Vec3::new(transform[(0, i)], transform[(1, i)], transform[(2, i)]);
        let mut axes = [column(0), column(1), column(2)];
        let mut half_size = Vec3::zeros();
        for (i, axis) in axes.iter_mut().enumerate() {
            let scale = axis.magnitude();
            half_size[i] = scale * 0.5;
            *axis = if scale > f32::EPSILON {
                *axis / scale
            } else {
                Vec3::zeros()
            };
        }
        Self {
            center: column(3),
            axes,
            half_size,
        }
    }

    /// World-space center of the box
    #[must_use]
    pub const fn center(&self) -> Vec3 {
        self.center
    }

    /// Half-size along each local axis
    #[must_use]
    pub const fn half_size(&self) -> Vec3 {
        self.half_size
    }

    /// Matrix mapping the centered unit cube back onto this box
    ///
    /// Handy for debug visualization of the early-out volume.
    #[must_use]
    pub fn to_transform(&self) -> Mat4 {
        let mut m = Mat4::identity();
        for i in 0..3 {
            let scaled = self.axes[i] * (self.half_size[i] * 2.0);
            m[(0, i)] = scaled.x;
            m[(1, i)] = scaled.y;
            m[(2, i)] = scaled.z;
        }
        m[(0, 3)] = self.center.x;
        m[(1, 3)] = self.center.y;
        m[(2, 3)] = self.center.z;
        m
    }

    /// Map a world-space point into the box's local frame
    fn to_local(&self, point: Vec3) -> Vec3 {
        let d = point - self.center;
        Vec3::new(self.axes[0].dot(&d), self.axes[1].dot(&d), self.axes[2].dot(&d))
    }

    /// Test ray intersection, returning the entry distance in units of
    /// `ray_dir`
    #[must_use]
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let local_origin = self.to_local(ray_origin);
        let local_dir = Vec3::new(
            self.axes[0].dot(&ray_dir),
            self.axes[1].dot(&ray_dir),
            self.axes[2].dot(&ray_dir),
        );
        let local_box = Aabb::new(-self.half_size, self.half_size);
        local_box.intersect_ray(local_origin, local_dir)
    }

    /// Distance from `point` to the box surface (zero inside)
    #[must_use]
    pub fn min_distance(&self, point: Vec3) -> f32 {
        let local = self.to_local(point);
        let clamped = Vec3::new(
            local.x.clamp(-self.half_size.x, self.half_size.x),
            local.y.clamp(-self.half_size.y, self.half_size.y),
            local.z.clamp(-self.half_size.z, self.half_size.z),
        );
        (local - clamped).magnitude()
    }
}
