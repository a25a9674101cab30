//! Primitive collision shapes and intersection algorithms
//!
//! Spheres and triangles with the intersection tests the mesh queries
//! build on: winding-filtered ray/triangle intersection (rays given as an
//! origin plus a displacement vector) and closest-point-on-triangle for
//! sphere contact.

use crate::foundation::math::{safe_normalize, Vec3};

/// A sphere for contact queries
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given center and radius
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Closest point on `triangle` if the sphere touches it
    ///
    /// Returns the contact point on the triangle surface, or `None` when the
    /// sphere is clear of the triangle.
    #[must_use]
    pub fn intersect_triangle(&self, triangle: &Triangle) -> Option<Vec3> {
        let closest = triangle.closest_point(self.center);
        if (closest - self.center).magnitude_squared() <= self.radius * self.radius {
            Some(closest)
        } else {
            None
        }
    }
}

/// A hit produced by a winding-filtered ray/triangle test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Intersection point
    pub point: Vec3,
    /// Unit face normal (right-hand rule)
    pub normal: Vec3,
    /// Distance in units of the ray vector (`0..=1` for limited rays)
    pub t: f32,
}

/// A triangle for collision detection
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    #[must_use]
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        safe_normalize(edge1.cross(&edge2))
    }

    /// Calculates the centroid (center point) of the triangle
    #[must_use]
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Winding-filtered ray/triangle intersection
    ///
    /// `ray` is the full displacement vector, not a unit direction: with
    /// `limit_ray` set, only hits within `0..=1` of the vector count, which
    /// is how length-limited casts are expressed. `hit_ccw`/`hit_cw` select
    /// which facing may be hit; a face whose winding is filtered out is
    /// passed through as if it were not there.
    #[must_use]
    pub fn intersect_ray_filtered(
        &self,
        origin: Vec3,
        ray: Vec3,
        limit_ray: bool,
        hit_ccw: bool,
        hit_cw: bool,
    ) -> Option<TriangleHit> {
        let ab = self.v1 - self.v0;
        let ac = self.v2 - self.v0;
        let n = ab.cross(&ac);
        let qp = -ray;

        // The sign of the denominator distinguishes the facing
        let d = qp.dot(&n);
        if !hit_ccw && d > 0.0 {
            return None;
        }
        if !hit_cw && d < 0.0 {
            return None;
        }
        // Parallel
        if d * d < 0.001 {
            return None;
        }
        let ood = 1.0 / d;

        let ap = origin - self.v0;
        let t = ap.dot(&n) * ood;
        if t < 0.0 {
            return None;
        }
        if limit_ray && t > 1.0 {
            return None;
        }

        // Barycentric coordinate checks
        let e = qp.cross(&ap);
        let v = ac.dot(&e) * ood;
        if !(0.0..=1.0).contains(&v) {
            return None;
        }
        let w = -ab.dot(&e) * ood;
        if w < 0.0 || v + w > 1.0 {
            return None;
        }

        Some(TriangleHit {
            point: origin + ray * t,
            normal: safe_normalize(n),
            t,
        })
    }

    /// Get the closest point on the triangle to a given point
    #[must_use]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let v0_to_point = point - self.v0;

        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);

        // Vertex region outside v0
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.v0;
        }

        // Vertex region outside v1
        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return self.v1;
        }

        // Vertex region outside v2
        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return self.v2;
        }

        // Edge regions
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return self.v0 + edge1 * v;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.v0 + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.v1 + (self.v2 - self.v1) * w;
        }

        // Point projects inside the triangle
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        self.v0 + edge1 * v + edge2 * w
    }
}
