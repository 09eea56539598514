//! Arena layout: playable bounds, spawn anchors and fixed obstacles

use glam::Vec2;

use crate::ws::protocol::Side;

use super::unit::DEFAULT_RADIUS;

/// Units spawned per side
pub const UNITS_PER_SIDE: usize = 3;

/// Fixed obstacle behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    /// Speeds a unit up and sharpens its attack
    BouncePillar,
    /// Round hazard that hurts on contact
    SpikePillar,
    /// Straight hazard strip along the arena edge
    SpikeWall,
}

impl ObstacleKind {
    /// Hazard damage dealt on contact
    pub fn damage(self) -> i32 {
        match self {
            Self::BouncePillar => 0,
            Self::SpikePillar | Self::SpikeWall => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleShape {
    Circle { center: Vec2, radius: f32 },
    Rect { min: Vec2, max: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub shape: ObstacleShape,
}

/// Axis-aligned playable area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl ArenaBounds {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self {
            min: origin,
            max: origin + size,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extent(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }
}

/// The battle board
#[derive(Debug, Clone)]
pub struct Arena {
    bounds: ArenaBounds,
    obstacles: Vec<Obstacle>,
}

impl Arena {
    pub const BOUNCE_PILLAR_RADIUS: f32 = 40.0;
    pub const SPIKE_PILLAR_RADIUS: f32 = 40.0;
    pub const SPIKE_WALL_WIDTH: f32 = 21.0;
    pub const SPIKE_WALL_LENGTH: f32 = 300.0;

    /// Arena with the standard obstacle layout
    pub fn new(bounds: ArenaBounds) -> Self {
        let mut arena = Self::empty(bounds);
        arena.obstacles = standard_obstacles(&bounds);
        arena
    }

    /// Arena with walls only
    pub fn empty(bounds: ArenaBounds) -> Self {
        Self {
            bounds,
            obstacles: Vec::new(),
        }
    }

    pub fn bounds(&self) -> &ArenaBounds {
        &self.bounds
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle(&self, index: usize) -> Option<&Obstacle> {
        self.obstacles.get(index)
    }

    /// Spawn anchors for one side: top, middle, bottom. Host units start on
    /// the left half, guest units mirror them on the right.
    pub fn spawn_points(&self, side: Side) -> [Vec2; UNITS_PER_SIDE] {
        let center = self.bounds.center();
        let half = self.bounds.half_extent();
        let dir = match side {
            Side::Host => -1.0,
            Side::Guest => 1.0,
        };
        [
            Vec2::new(center.x + dir * half.x * 0.6, center.y - half.y * 0.5),
            Vec2::new(center.x + dir * half.x * 0.5, center.y),
            Vec2::new(center.x + dir * half.x * 0.6, center.y + half.y * 0.5),
        ]
    }
}

fn standard_obstacles(bounds: &ArenaBounds) -> Vec<Obstacle> {
    let center = bounds.center();
    let wall = Arena::SPIKE_WALL_WIDTH;
    let len = Arena::SPIKE_WALL_LENGTH;
    let pillar = Arena::BOUNCE_PILLAR_RADIUS;

    vec![
        // Top-left corner
        Obstacle {
            kind: ObstacleKind::SpikeWall,
            shape: ObstacleShape::Rect {
                min: bounds.min,
                max: bounds.min + Vec2::new(wall, len),
            },
        },
        Obstacle {
            kind: ObstacleKind::SpikeWall,
            shape: ObstacleShape::Rect {
                min: bounds.min,
                max: bounds.min + Vec2::new(len, wall),
            },
        },
        // Bottom-right corner
        Obstacle {
            kind: ObstacleKind::SpikeWall,
            shape: ObstacleShape::Rect {
                min: bounds.max - Vec2::new(wall, len),
                max: bounds.max,
            },
        },
        Obstacle {
            kind: ObstacleKind::SpikeWall,
            shape: ObstacleShape::Rect {
                min: bounds.max - Vec2::new(len, wall),
                max: bounds.max,
            },
        },
        Obstacle {
            kind: ObstacleKind::BouncePillar,
            shape: ObstacleShape::Circle {
                center: Vec2::new(center.x, bounds.min.y + pillar),
                radius: pillar,
            },
        },
        Obstacle {
            kind: ObstacleKind::BouncePillar,
            shape: ObstacleShape::Circle {
                center: Vec2::new(center.x, bounds.max.y - pillar),
                radius: pillar,
            },
        },
        Obstacle {
            kind: ObstacleKind::SpikePillar,
            shape: ObstacleShape::Circle {
                center,
                radius: Arena::SPIKE_PILLAR_RADIUS,
            },
        },
    ]
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ArenaBounds::new(Vec2::new(125.0, 125.0), Vec2::new(1030.0, 550.0)))
    }
}
