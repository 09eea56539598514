//! Battle units: the player-owned pieces that get flung around the arena

use glam::Vec2;

use crate::util::vector::heading;
use crate::ws::protocol::{PlayerId, Side, UnitId};

use super::combat::{CombatSystem, Effect, HEAL_AMOUNT, MEGA_ATTACK_BONUS};
use super::physics::Body;

/// Collision radius of a unit
pub const DEFAULT_RADIUS: f32 = 50.0;

/// Launch velocity per unit of drag; negative so the shot flies away from the pull
pub const LAUNCH_SCALE: f32 = -10.0;

/// Charge meter per unit of drag
pub const CHARGE_SCALE: f32 = 0.5;

/// Drags shorter than this are treated as a cancelled shot
pub const MIN_DRAG: f32 = 1.0;

/// Velocity kept per tick
pub const VELOCITY_DAMPING: f32 = 0.94;

/// Below this speed a unit is brought to rest
pub const REST_SPEED: f32 = 10.0;

/// Angular velocity lost per tick
pub const ANGULAR_DECAY: f32 = 0.2;

/// Starting stats per side
#[derive(Debug, Clone)]
pub struct UnitStats {
    pub max_hp: i32,
    pub attack: i32,
    pub radius: f32,
    pub effect: Option<Effect>,
}

impl UnitStats {
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Host => Self {
                max_hp: 100,
                attack: 20,
                radius: DEFAULT_RADIUS,
                effect: Some(Effect::mega()),
            },
            Side::Guest => Self {
                max_hp: 100,
                attack: 20,
                radius: DEFAULT_RADIUS,
                effect: Some(Effect::heal()),
            },
        }
    }
}

/// Drag gesture in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charge {
    pub start: Vec2,
    pub current: Vec2,
}

impl Charge {
    pub fn drag(&self) -> Vec2 {
        self.current - self.start
    }

    pub fn amount(&self) -> f32 {
        self.drag().length() * CHARGE_SCALE
    }

    pub fn direction(&self) -> Vec2 {
        self.drag().normalize_or_zero()
    }

    pub fn launch_velocity(&self) -> Vec2 {
        self.drag() * LAUNCH_SCALE
    }
}

/// Result of a hit on a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Took damage and is still standing
    Hit { hp: i32 },
    /// Dropped to zero hp
    Defeated,
    /// Already defeated and waiting to respawn
    Ignored,
}

/// Last position/rotation pushed to the other peer
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReplicaCache {
    position: Vec2,
    rotation: f32,
}

/// Changes since the last replication push
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReplicaDelta {
    pub position: Option<Vec2>,
    pub rotation: Option<f32>,
}

/// A networked physics piece
#[derive(Debug, Clone)]
pub struct BattleUnit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub body: Body,
    hp: i32,
    max_hp: i32,
    attack: i32,
    effect: Option<Effect>,
    spawn: Vec2,
    charge: Option<Charge>,
    defeat_pending: bool,
    replica: ReplicaCache,
}

impl BattleUnit {
    pub fn new(id: UnitId, owner: PlayerId, spawn: Vec2, stats: &UnitStats) -> Self {
        Self {
            id,
            owner,
            body: Body::new(id, spawn, stats.radius),
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            attack: stats.attack,
            effect: stats.effect.clone(),
            spawn,
            charge: None,
            defeat_pending: false,
            replica: ReplicaCache {
                position: spawn,
                rotation: 0.0,
            },
        }
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn attack(&self) -> i32 {
        self.attack
    }

    pub fn effect(&self) -> Option<&Effect> {
        self.effect.as_ref()
    }

    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    pub fn speed(&self) -> f32 {
        self.body.speed()
    }

    /// Knocked out and waiting for the respawn
    pub fn is_defeated(&self) -> bool {
        self.defeat_pending
    }

    /// Whether a world point lies on the unit's collision circle
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.body.position.distance_squared(point) <= self.body.radius * self.body.radius
    }

    // ------------------------------------------------------------------
    // Charge gesture
    // ------------------------------------------------------------------

    pub fn is_charging(&self) -> bool {
        self.charge.is_some()
    }

    /// Start a drag anchored at the unit's current position
    pub fn begin_charge(&mut self) {
        let start = self.body.position;
        self.charge = Some(Charge { start, current: start });
    }

    /// Move the drag point. The unit turns to face the launch direction.
    pub fn drag_to(&mut self, point: Vec2) -> Option<Charge> {
        let charge = self.charge.as_mut()?;
        charge.current = point;
        let charge = *charge;
        if let Some(angle) = heading(charge.launch_velocity()) {
            self.body.rotation = angle;
        }
        Some(charge)
    }

    /// Finish the drag. Returns the launch velocity, or `None` when there was
    /// no charge or the drag was too short to count as a shot.
    pub fn release(&mut self, point: Vec2) -> Option<Vec2> {
        let mut charge = self.charge.take()?;
        charge.current = point;
        if charge.drag().length() < MIN_DRAG {
            return None;
        }
        Some(charge.launch_velocity())
    }

    /// Drop an in-progress drag; returns whether there was one
    pub fn cancel_charge(&mut self) -> bool {
        self.charge.take().is_some()
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Per-tick damping so units come to a full stop instead of creeping
    pub fn damp(&mut self) {
        self.body.velocity *= VELOCITY_DAMPING;
        if self.body.angular_velocity > 0.0 {
            self.body.angular_velocity = (self.body.angular_velocity - ANGULAR_DECAY).max(0.0);
        } else {
            self.body.angular_velocity = 0.0;
        }
        if self.body.velocity.length() < REST_SPEED {
            self.body.velocity = Vec2::ZERO;
        }
    }

    pub fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        if self.defeat_pending {
            return DamageOutcome::Ignored;
        }
        let (hp, defeated) = CombatSystem::apply_damage(self.hp, amount);
        self.hp = hp;
        if defeated {
            self.defeat_pending = true;
            self.body.velocity = Vec2::ZERO;
            self.body.angular_velocity = 0.0;
            DamageOutcome::Defeated
        } else {
            DamageOutcome::Hit { hp }
        }
    }

    /// Apply a named effect; unknown names do nothing. Returns whether
    /// any stat changed.
    pub fn apply_effect(&mut self, effect: &Effect) -> bool {
        if self.defeat_pending {
            return false;
        }
        match effect.name.as_str() {
            Effect::MEGA => {
                self.attack += MEGA_ATTACK_BONUS;
                true
            }
            Effect::HEAL => {
                let healed = (self.hp + HEAL_AMOUNT).min(self.max_hp);
                let changed = healed != self.hp;
                self.hp = healed;
                changed
            }
            _ => false,
        }
    }

    /// Bounce pillar contact
    pub fn boost(&mut self, attack: i32, speed_factor: f32) {
        self.attack += attack;
        self.body.velocity *= speed_factor;
    }

    /// Back to the spawn point with full hp. Attack bonuses are kept.
    pub fn respawn(&mut self) {
        self.hp = self.max_hp;
        self.defeat_pending = false;
        self.charge = None;
        self.body.position = self.spawn;
        self.body.velocity = Vec2::ZERO;
        self.body.rotation = 0.0;
        self.body.angular_velocity = 0.0;
    }

    // ------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------

    /// Compare against the last pushed state and remember the current one
    pub fn take_replica_delta(&mut self) -> ReplicaDelta {
        let mut delta = ReplicaDelta::default();
        if self.body.position != self.replica.position {
            self.replica.position = self.body.position;
            delta.position = Some(self.body.position);
        }
        if self.body.rotation != self.replica.rotation {
            self.replica.rotation = self.body.rotation;
            delta.rotation = Some(self.body.rotation);
        }
        delta
    }

    /// Take a host position push
    pub fn set_replicated_position(&mut self, position: Vec2) {
        self.body.position = position;
        self.replica.position = position;
    }

    /// Take a host rotation push
    pub fn set_replicated_rotation(&mut self, rotation: f32) {
        self.body.rotation = rotation;
        self.replica.rotation = rotation;
    }

    /// Take host-declared stats
    pub fn set_replicated_stats(&mut self, hp: i32, attack: i32) {
        self.hp = hp.clamp(0, self.max_hp);
        self.attack = attack;
        self.defeat_pending = self.hp == 0;
    }

    /// Host-declared defeat: stop in place until the respawn arrives
    pub fn mark_defeated(&mut self) {
        self.hp = 0;
        self.defeat_pending = true;
        self.charge = None;
        self.body.velocity = Vec2::ZERO;
        self.body.angular_velocity = 0.0;
    }
}
