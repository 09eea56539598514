//! 2D vector helpers shared by collision response and trajectory prediction

use glam::Vec2;

/// Reflect `vector` off a surface with the given `normal`.
///
/// The normal does not need to be unit length. A zero-length normal has no
/// defined reflection, so the vector is returned unchanged; callers are
/// expected to hand in real contact normals.
pub fn reflect(vector: Vec2, normal: Vec2) -> Vec2 {
    let Some(unit_normal) = normal.try_normalize() else {
        return vector;
    };
    vector - unit_normal * (2.0 * vector.dot(unit_normal))
}

/// Heading of a vector in radians, or `None` for a zero vector
pub fn heading(vector: Vec2) -> Option<f32> {
    if vector.length_squared() <= f32::EPSILON {
        None
    } else {
        Some(vector.y.atan2(vector.x))
    }
}
