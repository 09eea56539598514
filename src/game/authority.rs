//! Authority strategies: what the local peer is allowed to decide.
//!
//! The role is fixed when the match is set up. Units never look at it;
//! the controller routes every role-dependent step through the strategy.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ws::protocol::PeerMsg;

use super::arena::ObstacleKind;
use super::combat::{CombatSystem, ContactEffect};
use super::physics::{Body, Contact, PhysicsWorld};
use super::unit::BattleUnit;

/// Which end of the connection this peer is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Runs the authoritative simulation
    Host,
    /// Mirrors the host
    Guest,
}

impl Role {
    pub fn strategy(self) -> Box<dyn AuthorityStrategy> {
        match self {
            Self::Host => Box::new(HostAuthority),
            Self::Guest => Box::new(GuestAuthority),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Guest => f.write_str("guest"),
        }
    }
}

/// Role-specific behaviour behind one interface
pub trait AuthorityStrategy: Send {
    fn role(&self) -> Role;

    /// A local charge was released with `velocity`
    fn apply_launch(&self, unit: &mut BattleUnit, velocity: Vec2, outbox: &mut Vec<PeerMsg>);

    /// The local aim changed while charging
    fn on_aim(&self, unit: &BattleUnit, outbox: &mut Vec<PeerMsg>);

    /// Advance the physics world and report the contacts that matter here
    fn step_world(&self, world: &mut dyn PhysicsWorld, bodies: &mut [Body], dt: f32) -> Vec<Contact>;

    /// Outcome of `mover` touching `other`
    fn on_collision(&self, mover: &BattleUnit, other: &BattleUnit, mover_speed: f32) -> Option<ContactEffect>;

    /// Outcome of `unit` touching a fixed obstacle
    fn on_obstacle(&self, unit: &BattleUnit, kind: ObstacleKind) -> Option<ContactEffect>;

    /// Per-tick upkeep for one unit
    fn on_tick(&self, unit: &mut BattleUnit, outbox: &mut Vec<PeerMsg>);
}

/// Owns physics, damage and replication
pub struct HostAuthority;

impl AuthorityStrategy for HostAuthority {
    fn role(&self) -> Role {
        Role::Host
    }

    fn apply_launch(&self, unit: &mut BattleUnit, velocity: Vec2, _outbox: &mut Vec<PeerMsg>) {
        unit.body.velocity = velocity;
    }

    fn on_aim(&self, _unit: &BattleUnit, _outbox: &mut Vec<PeerMsg>) {
        // Rotation goes out with the next replication push
    }

    fn step_world(&self, world: &mut dyn PhysicsWorld, bodies: &mut [Body], dt: f32) -> Vec<Contact> {
        world.step(bodies, dt)
    }

    fn on_collision(&self, mover: &BattleUnit, other: &BattleUnit, mover_speed: f32) -> Option<ContactEffect> {
        CombatSystem::unit_contact(mover, other, mover_speed)
    }

    fn on_obstacle(&self, unit: &BattleUnit, kind: ObstacleKind) -> Option<ContactEffect> {
        CombatSystem::obstacle_contact(unit, kind)
    }

    fn on_tick(&self, unit: &mut BattleUnit, outbox: &mut Vec<PeerMsg>) {
        unit.damp();
        let delta = unit.take_replica_delta();
        if let Some(pos) = delta.position {
            outbox.push(PeerMsg::UnitPosition {
                id: unit.id,
                pos: pos.into(),
            });
        }
        if let Some(rotation) = delta.rotation {
            outbox.push(PeerMsg::UnitRotation { id: unit.id, rotation });
        }
    }
}

/// Presentational replica; asks the host to act on its behalf
pub struct GuestAuthority;

impl AuthorityStrategy for GuestAuthority {
    fn role(&self) -> Role {
        Role::Guest
    }

    fn apply_launch(&self, unit: &mut BattleUnit, velocity: Vec2, outbox: &mut Vec<PeerMsg>) {
        outbox.push(PeerMsg::ReleaseCharge {
            id: unit.id,
            vel: velocity.into(),
        });
    }

    fn on_aim(&self, unit: &BattleUnit, outbox: &mut Vec<PeerMsg>) {
        outbox.push(PeerMsg::UnitAim {
            id: unit.id,
            rotation: unit.body.rotation,
        });
    }

    fn step_world(&self, _world: &mut dyn PhysicsWorld, _bodies: &mut [Body], _dt: f32) -> Vec<Contact> {
        // Positions arrive from the host
        Vec::new()
    }

    fn on_collision(&self, _mover: &BattleUnit, _other: &BattleUnit, _mover_speed: f32) -> Option<ContactEffect> {
        None
    }

    fn on_obstacle(&self, _unit: &BattleUnit, _kind: ObstacleKind) -> Option<ContactEffect> {
        None
    }

    fn on_tick(&self, _unit: &mut BattleUnit, _outbox: &mut Vec<PeerMsg>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::unit::UnitStats;
    use crate::ws::protocol::{PlayerId, Side, UnitId, WireVec};

    fn unit(side: Side) -> BattleUnit {
        BattleUnit::new(
            UnitId::new(side, 0),
            PlayerId::new(format!("{side:?}")),
            Vec2::new(100.0, 100.0),
            &UnitStats::for_side(side),
        )
    }

    #[test]
    fn test_host_launch_moves_the_unit() {
        let mut u = unit(Side::Host);
        let mut outbox = Vec::new();
        Role::Host.strategy().apply_launch(&mut u, Vec2::new(300.0, 0.0), &mut outbox);
        assert_eq!(u.body.velocity, Vec2::new(300.0, 0.0));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_guest_launch_sends_intent_only() {
        let mut u = unit(Side::Guest);
        let mut outbox = Vec::new();
        Role::Guest.strategy().apply_launch(&mut u, Vec2::new(-300.0, 5.0), &mut outbox);
        assert_eq!(u.body.velocity, Vec2::ZERO);
        assert_eq!(
            outbox,
            vec![PeerMsg::ReleaseCharge {
                id: u.id,
                vel: WireVec { x: -300.0, y: 5.0 },
            }]
        );
    }

    #[test]
    fn test_host_tick_pushes_only_changes() {
        let host = Role::Host.strategy();
        let mut u = unit(Side::Host);
        let mut outbox = Vec::new();

        host.on_tick(&mut u, &mut outbox);
        assert!(outbox.is_empty());

        u.body.position.x += 12.0;
        host.on_tick(&mut u, &mut outbox);
        assert_eq!(outbox.len(), 1);
        assert!(matches!(outbox[0], PeerMsg::UnitPosition { .. }));
    }

    #[test]
    fn test_guest_ignores_contacts() {
        let guest = Role::Guest.strategy();
        let a = unit(Side::Host);
        let b = unit(Side::Guest);
        assert_eq!(guest.on_collision(&a, &b, 500.0), None);
        assert_eq!(guest.on_obstacle(&a, ObstacleKind::SpikeWall), None);
    }
}
