//! Shot preview: where a launch would travel, with at most one bounce

use glam::Vec2;

use crate::util::time::tick_delta;
use crate::util::vector::reflect;
use crate::ws::protocol::UnitId;

use super::physics::{Body, PhysicsWorld};
use super::unit::VELOCITY_DAMPING;

/// Distance a unit launched at `speed` covers before damping stops it
pub fn travel_distance(speed: f32) -> f32 {
    speed * tick_delta() / (1.0 - VELOCITY_DAMPING)
}

/// Predict the path of a launch as a polyline of two or three points.
///
/// The first ray runs from `origin` along the launch velocity for the whole
/// expected travel distance, ignoring the caster. If it hits something the
/// path reflects off the contact normal and a second ray covers the distance
/// that is left. Returns an empty path for a zero launch.
pub fn predict(
    world: &dyn PhysicsWorld,
    bodies: &[Body],
    caster: UnitId,
    origin: Vec2,
    launch_velocity: Vec2,
) -> Vec<Vec2> {
    let Some(direction) = launch_velocity.try_normalize() else {
        return Vec::new();
    };
    let reach = travel_distance(launch_velocity.length());

    let Some(first) = world.ray_cast(bodies, origin, direction, reach, Some(caster)) else {
        return vec![origin, origin + direction * reach];
    };

    let remaining = reach - first.distance;
    let bounced = reflect(direction, first.normal);
    let end = match bounced.try_normalize() {
        Some(dir) if remaining > 0.0 => world
            .ray_cast(bodies, first.point, dir, remaining, Some(caster))
            .map(|second| second.point)
            .unwrap_or(first.point + dir * remaining),
        _ => return vec![origin, first.point],
    };

    vec![origin, first.point, end]
}
