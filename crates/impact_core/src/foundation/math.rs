//! Math utilities and types
//!
//! Provides fundamental math types for 3D collision and spatial queries.

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Normalize a vector, returning zero for degenerate input
///
/// Collision code frequently normalizes cross products of nearly collinear
/// edges; a zero result is preferable to NaNs propagating into hit records.
pub fn safe_normalize(v: Vec3) -> Vec3 {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
}

/// Remove the component of `v` pointing along `direction`
///
/// Only the positive projection is removed: a velocity already moving away
/// from a surface is left untouched. `direction` does not need to be
/// normalized.
pub fn zero_direction(v: Vec3, direction: Vec3) -> Vec3 {
    let n = safe_normalize(direction);
    let d = v.dot(&n);
    if d > 0.0 {
        v - n * d
    } else {
        v
    }
}

/// Transform a position by a 4x4 matrix (w = 1)
pub fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    let q = m * Vec4::new(p.x, p.y, p.z, 1.0);
    Vec3::new(q.x, q.y, q.z)
}

/// Transform a direction by a 4x4 matrix (w = 0, no translation)
pub fn transform_vector(m: &Mat4, v: Vec3) -> Vec3 {
    let q = m * Vec4::new(v.x, v.y, v.z, 0.0);
    Vec3::new(q.x, q.y, q.z)
}
