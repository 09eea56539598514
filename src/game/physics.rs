//! Rigid-body world: integration, contact detection and ray casts

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::util::vector::reflect;
use crate::ws::protocol::UnitId;

use super::arena::{Arena, ObstacleShape};

/// Rays and contacts closer than this are treated as touching the origin
const SURFACE_EPSILON: f32 = 1e-3;

/// Physical state of one unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: UnitId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub angular_velocity: f32,
    pub radius: f32,
}

impl Body {
    pub fn new(id: UnitId, position: Vec2, radius: f32) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            angular_velocity: 0.0,
            radius,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Edge of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// What a unit touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactTarget {
    Unit(UnitId),
    /// Index into the arena's obstacle list
    Obstacle(usize),
    Wall(WallSide),
}

/// Start of a contact between a unit and something else
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub unit: UnitId,
    pub other: ContactTarget,
    /// Points from the unit towards the other collider
    pub normal: Vec2,
    /// Speed of `unit` before the contact was resolved
    pub speed: f32,
}

/// Nearest ray intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    /// Surface normal at the hit, facing back towards the ray origin
    pub normal: Vec2,
    pub distance: f32,
    pub target: ContactTarget,
}

/// The 2D physics engine the match runs on.
///
/// `step` integrates the bodies in place and reports contacts that started
/// during the step. `ray_cast` looks for the nearest collider along a ray,
/// skipping the unit named in `ignore`.
pub trait PhysicsWorld: Send {
    fn step(&mut self, bodies: &mut [Body], dt: f32) -> Vec<Contact>;

    fn ray_cast(
        &self,
        bodies: &[Body],
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        ignore: Option<UnitId>,
    ) -> Option<RayHit>;
}

/// Circle-body physics inside an arena with fixed obstacles
pub struct ArenaPhysics {
    arena: Arena,
    touching: HashSet<(UnitId, ContactTarget)>,
}

impl ArenaPhysics {
    pub fn new(arena: Arena) -> Self {
        Self {
            arena,
            touching: HashSet::new(),
        }
    }

    /// Check collision between two circles
    pub fn check_circle_collision(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
        let combined = radius_a + radius_b;
        a.distance_squared(b) <= combined * combined
    }

    /// Push two overlapping circles apart.
    /// Returns (new_a, new_b)
    pub fn resolve_circle_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> (Vec2, Vec2) {
        let delta = b - a;
        let dist = delta.length();

        if dist < 0.001 {
            // Same position, push apart arbitrarily
            return (a - Vec2::X * radius_a, b + Vec2::X * radius_b);
        }

        let overlap = radius_a + radius_b - dist;
        if overlap <= 0.0 {
            return (a, b);
        }

        let normal = delta / dist;
        let push = overlap / 2.0 + 0.1; // Small buffer
        (a - normal * push, b + normal * push)
    }

    /// Keep a body inside the walls, bouncing it off any wall it crossed
    fn resolve_walls(&self, body: &mut Body, touching: &mut Vec<(ContactTarget, Vec2)>) {
        let bounds = self.arena.bounds();
        let r = body.radius;
        let walls = [
            (WallSide::Left, body.position.x - r < bounds.min.x, Vec2::NEG_X),
            (WallSide::Right, body.position.x + r > bounds.max.x, Vec2::X),
            (WallSide::Top, body.position.y - r < bounds.min.y, Vec2::NEG_Y),
            (WallSide::Bottom, body.position.y + r > bounds.max.y, Vec2::Y),
        ];

        for (side, crossed, outward) in walls {
            if !crossed {
                continue;
            }
            touching.push((ContactTarget::Wall(side), outward));
            match side {
                WallSide::Left => body.position.x = bounds.min.x + r,
                WallSide::Right => body.position.x = bounds.max.x - r,
                WallSide::Top => body.position.y = bounds.min.y + r,
                WallSide::Bottom => body.position.y = bounds.max.y - r,
            }
            if body.velocity.dot(outward) > 0.0 {
                body.velocity = reflect(body.velocity, outward);
            }
        }
    }

    fn resolve_obstacles(&self, body: &mut Body, touching: &mut Vec<(ContactTarget, Vec2)>) {
        for (index, obstacle) in self.arena.obstacles().iter().enumerate() {
            let closest = match obstacle.shape {
                ObstacleShape::Circle { center, radius } => {
                    let dir = (body.position - center).normalize_or_zero();
                    center + dir * radius
                }
                ObstacleShape::Rect { min, max } => body.position.clamp(min, max),
            };

            let offset = body.position - closest;
            let dist = offset.length();
            if dist >= body.radius {
                continue;
            }

            // Normal from the body towards the obstacle
            let toward = if dist > SURFACE_EPSILON {
                -offset / dist
            } else {
                match obstacle.shape {
                    ObstacleShape::Circle { center, .. } => (center - body.position).normalize_or_zero(),
                    ObstacleShape::Rect { min, max } => ((min + max) * 0.5 - body.position).normalize_or_zero(),
                }
            };
            touching.push((ContactTarget::Obstacle(index), toward));

            body.position = closest - toward * (body.radius + 0.1);
            if body.velocity.dot(toward) > 0.0 {
                body.velocity = reflect(body.velocity, toward);
            }
        }
    }
}

impl PhysicsWorld for ArenaPhysics {
    fn step(&mut self, bodies: &mut [Body], dt: f32) -> Vec<Contact> {
        let speeds: HashMap<UnitId, f32> = bodies.iter().map(|b| (b.id, b.speed())).collect();
        let mut now_touching: Vec<(UnitId, ContactTarget, Vec2)> = Vec::new();

        for body in bodies.iter_mut() {
            body.position += body.velocity * dt;
            body.rotation = (body.rotation + body.angular_velocity * dt).rem_euclid(std::f32::consts::TAU);

            let mut touching = Vec::new();
            self.resolve_walls(body, &mut touching);
            self.resolve_obstacles(body, &mut touching);
            now_touching.extend(touching.into_iter().map(|(target, normal)| (body.id, target, normal)));
        }

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (a, b) = (bodies[i], bodies[j]);
                if !Self::check_circle_collision(a.position, a.radius, b.position, b.radius) {
                    continue;
                }

                let normal = (b.position - a.position).try_normalize().unwrap_or(Vec2::X);
                now_touching.push((a.id, ContactTarget::Unit(b.id), normal));
                now_touching.push((b.id, ContactTarget::Unit(a.id), -normal));

                let (new_a, new_b) =
                    Self::resolve_circle_overlap(a.position, a.radius, b.position, b.radius);
                bodies[i].position = new_a;
                bodies[j].position = new_b;

                // Equal-mass elastic exchange along the normal
                let approach = (b.velocity - a.velocity).dot(normal);
                if approach < 0.0 {
                    bodies[i].velocity += normal * approach;
                    bodies[j].velocity -= normal * approach;
                }
            }
        }

        let mut contacts = Vec::new();
        let mut next = HashSet::with_capacity(now_touching.len());
        for (unit, other, normal) in now_touching {
            let key = (unit, other);
            if !self.touching.contains(&key) && !next.contains(&key) {
                contacts.push(Contact {
                    unit,
                    other,
                    normal,
                    speed: speeds.get(&unit).copied().unwrap_or(0.0),
                });
            }
            next.insert(key);
        }
        self.touching = next;

        contacts
    }

    fn ray_cast(
        &self,
        bodies: &[Body],
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        ignore: Option<UnitId>,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize()?;
        if max_distance <= 0.0 {
            return None;
        }

        let mut best: Option<RayHit> = None;
        let mut consider = |hit: Option<(f32, Vec2)>, target: ContactTarget| {
            if let Some((distance, normal)) = hit {
                if distance <= max_distance && best.map_or(true, |b| distance < b.distance) {
                    best = Some(RayHit {
                        point: origin + dir * distance,
                        normal,
                        distance,
                        target,
                    });
                }
            }
        };

        for body in bodies {
            if Some(body.id) == ignore {
                continue;
            }
            consider(
                ray_circle(origin, dir, body.position, body.radius),
                ContactTarget::Unit(body.id),
            );
        }

        for (index, obstacle) in self.arena.obstacles().iter().enumerate() {
            let hit = match obstacle.shape {
                ObstacleShape::Circle { center, radius } => ray_circle(origin, dir, center, radius),
                ObstacleShape::Rect { min, max } => ray_rect(origin, dir, min, max),
            };
            consider(hit, ContactTarget::Obstacle(index));
        }

        let bounds = self.arena.bounds();
        let walls = [
            (dir.x < 0.0, (bounds.min.x - origin.x) / dir.x, Vec2::X, WallSide::Left),
            (dir.x > 0.0, (bounds.max.x - origin.x) / dir.x, Vec2::NEG_X, WallSide::Right),
            (dir.y < 0.0, (bounds.min.y - origin.y) / dir.y, Vec2::Y, WallSide::Top),
            (dir.y > 0.0, (bounds.max.y - origin.y) / dir.y, Vec2::NEG_Y, WallSide::Bottom),
        ];
        for (facing, distance, normal, side) in walls {
            if facing && distance > SURFACE_EPSILON {
                consider(Some((distance, normal)), ContactTarget::Wall(side));
            }
        }

        best
    }
}

/// Entry distance and normal of a ray into a circle
fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<(f32, Vec2)> {
    let to_origin = origin - center;
    let b = to_origin.dot(dir);
    let c = to_origin.length_squared() - radius * radius;
    if c < 0.0 {
        // Origin inside the circle, the ray is leaving it
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t <= SURFACE_EPSILON {
        return None;
    }
    let point = origin + dir * t;
    Some((t, (point - center).normalize_or_zero()))
}

/// Entry distance and normal of a ray into an axis-aligned rectangle
fn ray_rect(origin: Vec2, dir: Vec2, min: Vec2, max: Vec2) -> Option<(f32, Vec2)> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], dir[axis], min[axis], max[axis]);
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
        let mut n = Vec2::ZERO;
        n[axis] = -d.signum();
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            normal = n;
        }
        t_exit = t_exit.min(t1);
    }

    if t_enter > t_exit || t_enter <= SURFACE_EPSILON {
        return None;
    }
    Some((t_enter, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::{ArenaBounds, ObstacleKind};
    use crate::ws::protocol::Side;

    fn open_arena() -> ArenaPhysics {
        ArenaPhysics::new(Arena::empty(ArenaBounds::new(Vec2::ZERO, Vec2::new(1000.0, 600.0))))
    }

    fn unit(index: u8, side: Side, x: f32, y: f32) -> Body {
        Body::new(UnitId::new(side, index), Vec2::new(x, y), 50.0)
    }

    #[test]
    fn test_circle_collision() {
        assert!(ArenaPhysics::check_circle_collision(Vec2::ZERO, 50.0, Vec2::new(99.0, 0.0), 50.0));
        assert!(!ArenaPhysics::check_circle_collision(Vec2::ZERO, 50.0, Vec2::new(101.0, 0.0), 50.0));
    }

    #[test]
    fn test_resolve_overlap_pushes_apart() {
        let (a, b) = ArenaPhysics::resolve_circle_overlap(Vec2::ZERO, 50.0, Vec2::new(80.0, 0.0), 50.0);
        assert!(a.distance(b) >= 100.0);
    }

    #[test]
    fn test_head_on_contact_starts_once() {
        let mut world = open_arena();
        let mut bodies = vec![unit(0, Side::Host, 300.0, 300.0), unit(0, Side::Guest, 420.0, 300.0)];
        bodies[0].velocity = Vec2::new(900.0, 0.0);

        let contacts = world.step(&mut bodies, 1.0 / 30.0);
        assert_eq!(contacts.len(), 2);
        let mover = contacts.iter().find(|c| c.unit == bodies[0].id).unwrap();
        assert_eq!(mover.other, ContactTarget::Unit(bodies[1].id));
        assert!((mover.speed - 900.0).abs() < 1e-3);
        assert!(mover.normal.x > 0.99);
        let struck = contacts.iter().find(|c| c.unit == bodies[1].id).unwrap();
        assert_eq!(struck.speed, 0.0);

        // Momentum moved to the struck body
        assert!(bodies[0].velocity.x.abs() < 1e-3);
        assert!((bodies[1].velocity.x - 900.0).abs() < 1e-3);
    }

    #[test]
    fn test_wall_bounce_reflects() {
        let mut world = open_arena();
        let mut bodies = vec![unit(0, Side::Host, 955.0, 300.0)];
        bodies[0].velocity = Vec2::new(300.0, 30.0);

        let contacts = world.step(&mut bodies, 1.0 / 30.0);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].other, ContactTarget::Wall(WallSide::Right));
        assert!(bodies[0].velocity.x < 0.0);
        assert!(bodies[0].position.x <= 950.0);
    }

    #[test]
    fn test_ray_cast_ignores_caster_and_finds_nearest() {
        let world = open_arena();
        let bodies = vec![unit(0, Side::Host, 200.0, 300.0), unit(0, Side::Guest, 600.0, 300.0)];

        let hit = world
            .ray_cast(&bodies, Vec2::new(200.0, 300.0), Vec2::X, 2000.0, Some(bodies[0].id))
            .unwrap();
        assert_eq!(hit.target, ContactTarget::Unit(bodies[1].id));
        assert!((hit.point.x - 550.0).abs() < 1e-2);
        assert!(hit.normal.x < -0.99);

        // Short ray misses
        assert!(world
            .ray_cast(&bodies, Vec2::new(200.0, 300.0), Vec2::X, 100.0, Some(bodies[0].id))
            .is_none());
    }

    #[test]
    fn test_ray_cast_hits_wall_from_inside() {
        let world = open_arena();
        let hit = world
            .ray_cast(&[], Vec2::new(500.0, 300.0), Vec2::NEG_Y, 1000.0, None)
            .unwrap();
        assert_eq!(hit.target, ContactTarget::Wall(WallSide::Top));
        assert!((hit.distance - 300.0).abs() < 1e-3);
        assert_eq!(hit.normal, Vec2::Y);
        assert!(world.ray_cast(&[], Vec2::new(500.0, 300.0), Vec2::ZERO, 1000.0, None).is_none());
    }

    #[test]
    fn test_obstacle_contact_and_ray() {
        let bounds = ArenaBounds::new(Vec2::ZERO, Vec2::new(1000.0, 600.0));
        let arena = Arena::new(bounds);
        let pillar_index = arena
            .obstacles()
            .iter()
            .position(|o| o.kind == ObstacleKind::SpikePillar)
            .unwrap();
        let mut world = ArenaPhysics::new(arena);

        let hit = world
            .ray_cast(&[], Vec2::new(300.0, 300.0), Vec2::X, 1000.0, None)
            .unwrap();
        assert_eq!(hit.target, ContactTarget::Obstacle(pillar_index));
        assert!((hit.point.x - 460.0).abs() < 1e-2);

        let mut bodies = vec![unit(0, Side::Host, 400.0, 300.0)];
        bodies[0].velocity = Vec2::new(600.0, 0.0);
        let contacts = world.step(&mut bodies, 1.0 / 30.0);
        assert!(contacts
            .iter()
            .any(|c| c.other == ContactTarget::Obstacle(pillar_index)));
        assert!(bodies[0].velocity.x < 0.0);
    }
}
