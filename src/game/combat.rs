//! Combat rules - contact outcomes, damage and status effects

use serde::{Deserialize, Serialize};

use crate::ws::protocol::UnitId;

use super::arena::ObstacleKind;
use super::unit::BattleUnit;

/// A mover slower than this deals no damage on contact
pub const CONTACT_SPEED_EPSILON: f32 = 0.01;

/// Attack added by the "mega" effect
pub const MEGA_ATTACK_BONUS: i32 = 10;

/// Hit points restored by the "heal" effect
pub const HEAL_AMOUNT: i32 = 10;

/// Attack added by a bounce pillar
pub const BOUNCE_ATTACK_BONUS: i32 = 1;

/// Velocity multiplier applied by a bounce pillar
pub const BOUNCE_SPEED_FACTOR: f32 = 1.5;

/// Status effect a unit passes to friendly units it bumps into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    pub duration: u32,
}

impl Effect {
    pub const MEGA: &'static str = "mega";
    pub const HEAL: &'static str = "heal";

    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    pub fn mega() -> Self {
        Self::new(Self::MEGA, 1)
    }

    pub fn heal() -> Self {
        Self::new(Self::HEAL, 0)
    }
}

/// What knocked a unit out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefeatCause {
    /// Rammed by another unit
    Unit(UnitId),
    /// Ran into a hazard
    Hazard(ObstacleKind),
}

/// Side effect a contact resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum ContactEffect {
    Damage {
        target: UnitId,
        amount: i32,
        cause: DefeatCause,
    },
    ApplyEffect {
        target: UnitId,
        effect: Effect,
    },
    Boost {
        target: UnitId,
        attack: i32,
        speed_factor: f32,
    },
}

/// Combat rules shared by every authority that resolves contacts
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to hit points, returns (new_hp, is_defeated)
    pub fn apply_damage(current_hp: i32, damage: i32) -> (i32, bool) {
        let new_hp = (current_hp - damage.max(0)).max(0);
        (new_hp, new_hp == 0)
    }

    /// Contact between two units, seen from the moving one.
    ///
    /// Opponents take the mover's attack as damage; a friendly unit receives
    /// the mover's effect, if it carries one.
    pub fn unit_contact(mover: &BattleUnit, other: &BattleUnit, mover_speed: f32) -> Option<ContactEffect> {
        if mover_speed <= CONTACT_SPEED_EPSILON {
            return None;
        }

        if mover.owner != other.owner {
            Some(ContactEffect::Damage {
                target: other.id,
                amount: mover.attack(),
                cause: DefeatCause::Unit(mover.id),
            })
        } else {
            mover.effect().map(|effect| ContactEffect::ApplyEffect {
                target: other.id,
                effect: effect.clone(),
            })
        }
    }

    /// Contact between a unit and a fixed obstacle
    pub fn obstacle_contact(unit: &BattleUnit, kind: ObstacleKind) -> Option<ContactEffect> {
        match kind {
            ObstacleKind::BouncePillar => Some(ContactEffect::Boost {
                target: unit.id,
                attack: BOUNCE_ATTACK_BONUS,
                speed_factor: BOUNCE_SPEED_FACTOR,
            }),
            ObstacleKind::SpikePillar | ObstacleKind::SpikeWall => Some(ContactEffect::Damage {
                target: unit.id,
                amount: kind.damage(),
                cause: DefeatCause::Hazard(kind),
            }),
        }
    }
}
