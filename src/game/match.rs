//! Match controller: turn flow, message dispatch and ceremonies.
//!
//! One controller runs on each peer. The host's copy owns the simulation and
//! decides every outcome; the guest's copy mirrors what the host announces
//! and forwards local intents. Outbound messages collect in an outbox that
//! the runner drains after every call.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::util::time::{secs_to_ticks, tick_delta};
use crate::ws::protocol::{PeerMsg, PlayerId, Side, UnitId};

use super::arena::Arena;
use super::authority::{AuthorityStrategy, Role};
use super::combat::{ContactEffect, DefeatCause};
use super::events::{MatchEvent, MatchObserver};
use super::physics::{ArenaPhysics, Body, Contact, ContactTarget, PhysicsWorld};
use super::schedule::Scheduler;
use super::score::ScoreBoard;
use super::trajectory;
use super::turn::{TurnError, TurnState};
use super::unit::{BattleUnit, Charge, DamageOutcome, UnitStats};

/// Every unit must be slower than this for the field to count as settled
pub const SETTLE_EPSILON: f32 = 0.1;

/// Time between a defeat and the respawn
pub const DEFEAT_CEREMONY_SECS: f32 = 1.0;

pub const COIN_FLIP_REVEAL_SECS: f32 = 2.0;
pub const COIN_FLIP_DISMISS_SECS: f32 = 4.0;

/// Delay between the end banner and the rematch prompt
pub const REMATCH_PROMPT_SECS: f32 = 1.0;

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Host: waiting for `game:ready`. Guest: waiting for the coin flip.
    WaitingForOpponent,
    /// Coin flip ceremony on screen
    CoinFlip,
    /// Waiting for the turn holder to shoot
    Idle,
    /// A shot is in flight
    PlayingOut,
    /// A winner was declared
    Ended,
    /// Someone declined the rematch
    Closed,
}

/// Local pointer input in world coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up(Vec2),
}

/// Everything needed to build a controller
#[derive(Debug, Clone)]
pub struct MatchSetup {
    pub role: Role,
    pub host: PlayerId,
    pub guest: PlayerId,
    pub arena: Arena,
    pub win_threshold: u32,
    /// Seeds the host's coin flip
    pub seed: u64,
}

impl MatchSetup {
    pub fn local(&self) -> &PlayerId {
        match self.role {
            Role::Host => &self.host,
            Role::Guest => &self.guest,
        }
    }
}

/// Work that happens some ticks after it was decided
#[derive(Debug, Clone)]
enum Deferred {
    ResolveDefeat { unit: UnitId, cause: DefeatCause },
    RevealCoinFlip,
    DismissCoinFlip,
    RematchPrompt,
}

/// Message handler table, picked once from the role
type Dispatcher = fn(&mut MatchController, PeerMsg);

#[derive(Debug, Default, Clone, Copy)]
struct RematchVotes {
    local: bool,
    remote: bool,
}

/// Per-peer match state machine
pub struct MatchController {
    role: Role,
    local: PlayerId,
    host: PlayerId,
    guest: PlayerId,
    arena: Arena,
    units: BTreeMap<UnitId, BattleUnit>,
    turns: TurnState,
    scores: ScoreBoard,
    phase: MatchPhase,
    physics: Box<dyn PhysicsWorld>,
    authority: Box<dyn AuthorityStrategy>,
    dispatch: Dispatcher,
    scheduler: Scheduler<Deferred>,
    outbox: Vec<PeerMsg>,
    observers: Vec<Box<dyn MatchObserver>>,
    rng: ChaCha8Rng,
    charging: Option<UnitId>,
    rematch: RematchVotes,
    tick: u64,
}

impl MatchController {
    /// Build a controller with the default arena physics
    pub fn new(setup: MatchSetup) -> Result<Self, TurnError> {
        let physics = Box::new(ArenaPhysics::new(setup.arena.clone()));
        Self::with_physics(setup, physics)
    }

    pub fn with_physics(setup: MatchSetup, physics: Box<dyn PhysicsWorld>) -> Result<Self, TurnError> {
        let mut rng = ChaCha8Rng::seed_from_u64(setup.seed);
        let players = vec![setup.host.clone(), setup.guest.clone()];
        let turns = TurnState::with_random_holder(players.clone(), &mut rng)?;
        let scores = ScoreBoard::new(&players, setup.win_threshold);
        let local = setup.local().clone();

        let mut units = BTreeMap::new();
        for (side, owner) in [(Side::Host, &setup.host), (Side::Guest, &setup.guest)] {
            let stats = UnitStats::for_side(side);
            for (index, spawn) in setup.arena.spawn_points(side).into_iter().enumerate() {
                let id = UnitId::new(side, index as u8);
                units.insert(id, BattleUnit::new(id, owner.clone(), spawn, &stats));
            }
        }

        let dispatch: Dispatcher = match setup.role {
            Role::Host => Self::dispatch_as_host,
            Role::Guest => Self::dispatch_as_guest,
        };

        Ok(Self {
            role: setup.role,
            local,
            host: setup.host,
            guest: setup.guest,
            arena: setup.arena,
            units,
            turns,
            scores,
            phase: MatchPhase::WaitingForOpponent,
            physics,
            authority: setup.role.strategy(),
            dispatch,
            scheduler: Scheduler::new(),
            outbox: Vec::new(),
            observers: Vec::new(),
            rng,
            charging: None,
            rematch: RematchVotes::default(),
            tick: 0,
        })
    }

    pub fn subscribe(&mut self, observer: Box<dyn MatchObserver>) {
        self.observers.push(observer);
    }

    /// Kick off the match. The guest announces it is ready; the host waits
    /// for that before flipping the coin.
    pub fn start(&mut self) {
        info!(role = %self.role, local = %self.local, "Match starting");
        if self.role == Role::Guest {
            self.outbox.push(PeerMsg::Ready);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_playing_out(&self) -> bool {
        self.phase == MatchPhase::PlayingOut
    }

    pub fn local_player(&self) -> &PlayerId {
        &self.local
    }

    pub fn local_side(&self) -> Side {
        match self.role {
            Role::Host => Side::Host,
            Role::Guest => Side::Guest,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn turns(&self) -> &TurnState {
        &self.turns
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.units.get_mut(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.values()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Messages queued for the other peer, in send order
    pub fn drain_outbox(&mut self) -> Vec<PeerMsg> {
        std::mem::take(&mut self.outbox)
    }

    /// Whether `player` may start a shot right now
    pub fn can_act(&self, player: &PlayerId) -> bool {
        self.phase == MatchPhase::Idle && self.turns.is_my_turn(player)
    }

    // ------------------------------------------------------------------
    // Inbound messages
    // ------------------------------------------------------------------

    pub fn handle_message(&mut self, msg: PeerMsg) {
        debug!(kind = msg.kind(), "Peer message");
        let dispatch = self.dispatch;
        dispatch(self, msg)
    }

    fn dispatch_as_host(&mut self, msg: PeerMsg) {
        match msg {
            PeerMsg::Ready => self.on_guest_ready(),
            PeerMsg::UnitAim { id, rotation } => self.on_remote_aim(id, rotation),
            PeerMsg::ReleaseCharge { id, vel } => self.on_remote_launch(id, vel.into()),
            PeerMsg::RematchAccept => self.on_remote_rematch(true),
            PeerMsg::RematchDecline => self.on_remote_rematch(false),
            other => warn!(kind = other.kind(), "Host ignoring a host-only message"),
        }
    }

    fn dispatch_as_guest(&mut self, msg: PeerMsg) {
        match msg {
            PeerMsg::CoinFlip { first_to_move } => self.on_coin_flip(first_to_move),
            PeerMsg::UnitPosition { id, pos } => {
                let Some(unit) = self.replicated_unit(id) else {
                    return;
                };
                let live = !unit.is_defeated();
                unit.set_replicated_position(pos.into());
                // A live unit moving while idle means the host's shot is out
                if live && self.phase == MatchPhase::Idle {
                    self.set_phase(MatchPhase::PlayingOut);
                }
            }
            PeerMsg::UnitRotation { id, rotation } => {
                if let Some(unit) = self.replicated_unit(id) {
                    unit.set_replicated_rotation(rotation);
                }
            }
            PeerMsg::UnitDefeat { id } => {
                if self.charging == Some(id) {
                    self.cancel_charge();
                }
                if let Some(unit) = self.replicated_unit(id) {
                    unit.mark_defeated();
                    self.emit(MatchEvent::DefeatCeremony { unit: id });
                }
            }
            PeerMsg::UnitStats { id, hp, attack } => {
                if let Some(unit) = self.replicated_unit(id) {
                    unit.set_replicated_stats(hp, attack);
                    let (hp, attack) = (unit.hp(), unit.attack());
                    self.emit(MatchEvent::UnitStatsChanged { unit: id, hp, attack });
                }
            }
            PeerMsg::ScoreUpdate {
                player_id,
                floatie_id,
                increment,
            } => {
                self.scores.add_score(&player_id, floatie_id, increment);
                let total = self.scores.player_score(&player_id);
                self.emit(MatchEvent::ScoreChanged {
                    player: player_id,
                    unit: floatie_id,
                    total,
                });
            }
            PeerMsg::TurnAdvance => {
                self.cancel_charge();
                self.turns.advance_turn();
                if self.phase == MatchPhase::PlayingOut {
                    self.set_phase(MatchPhase::Idle);
                }
                self.emit_turn_changed();
            }
            PeerMsg::End { winner } => self.finish_match(winner),
            PeerMsg::RematchAccept => self.on_remote_rematch(true),
            PeerMsg::RematchDecline => self.on_remote_rematch(false),
            other => warn!(kind = other.kind(), "Guest ignoring a guest-only message"),
        }
    }

    fn replicated_unit(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        let unit = self.units.get_mut(&id);
        if unit.is_none() {
            warn!(unit = %id, "Dropping message for unknown unit");
        }
        unit
    }

    fn on_guest_ready(&mut self) {
        if self.phase != MatchPhase::WaitingForOpponent {
            debug!(phase = ?self.phase, "Ignoring late ready");
            return;
        }
        self.begin_coin_flip();
    }

    /// Host: announce the first turn holder and run the ceremony
    fn begin_coin_flip(&mut self) {
        let first_to_move = self.turns.current_player().clone();
        info!(first_to_move = %first_to_move, "Coin flip");
        self.outbox.push(PeerMsg::CoinFlip {
            first_to_move: first_to_move.clone(),
        });
        self.start_coin_flip_ceremony(first_to_move);
    }

    /// Guest: adopt the host's coin flip
    fn on_coin_flip(&mut self, first_to_move: PlayerId) {
        if self.phase != MatchPhase::WaitingForOpponent {
            warn!(phase = ?self.phase, "Coin flip outside of match start");
            return;
        }
        if let Err(e) = self.turns.set_current_player(&first_to_move) {
            warn!(error = %e, "Rejecting coin flip");
            return;
        }
        self.start_coin_flip_ceremony(first_to_move);
    }

    fn start_coin_flip_ceremony(&mut self, first_to_move: PlayerId) {
        self.set_phase(MatchPhase::CoinFlip);
        let local_starts = first_to_move == self.local;
        self.emit(MatchEvent::CoinFlipStarted {
            first_to_move,
            local_starts,
        });
        self.scheduler
            .schedule(secs_to_ticks(COIN_FLIP_REVEAL_SECS), Deferred::RevealCoinFlip);
        self.scheduler
            .schedule(secs_to_ticks(COIN_FLIP_DISMISS_SECS), Deferred::DismissCoinFlip);
    }

    fn on_remote_aim(&mut self, id: UnitId, rotation: f32) {
        let allowed = self.can_act(&self.guest);
        let guest = self.guest.clone();
        let Some(unit) = self.units.get_mut(&id) else {
            warn!(unit = %id, "Guest aimed an unknown unit");
            return;
        };
        if unit.owner != guest || unit.is_defeated() || !allowed {
            warn!(unit = %id, phase = ?self.phase, "Dropping aim the guest may not make");
            return;
        }
        unit.body.rotation = rotation;
    }

    fn on_remote_launch(&mut self, id: UnitId, velocity: Vec2) {
        let allowed = self.can_act(&self.guest);
        let guest = self.guest.clone();
        let Some(unit) = self.units.get_mut(&id) else {
            warn!(unit = %id, "Launch for an unknown unit");
            return;
        };
        if unit.owner != guest || unit.is_defeated() || !allowed {
            warn!(unit = %id, phase = ?self.phase, "Dropping launch the guest may not make");
            return;
        }

        self.authority.apply_launch(unit, velocity, &mut self.outbox);
        info!(unit = %id, vx = velocity.x, vy = velocity.y, "Guest launched");
        self.set_phase(MatchPhase::PlayingOut);
    }

    // ------------------------------------------------------------------
    // Local input
    // ------------------------------------------------------------------

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(point) => self.on_pointer_down(point),
            PointerEvent::Move(point) => self.on_pointer_move(point),
            PointerEvent::Up(point) => {
                self.on_pointer_up(point);
            }
        }
    }

    /// Press on unit `index` of the local side, drag by `drag` and let go.
    /// Returns whether a shot went out.
    pub fn shoot(&mut self, index: u8, drag: Vec2) -> bool {
        let id = UnitId::new(self.local_side(), index);
        let Some(start) = self.units.get(&id).map(BattleUnit::position) else {
            return false;
        };
        self.on_pointer_down(start);
        if self.charging != Some(id) {
            return false;
        }
        self.on_pointer_move(start + drag);
        self.on_pointer_up(start + drag)
    }

    fn on_pointer_down(&mut self, point: Vec2) {
        if self.charging.is_some() || !self.can_act(&self.local) {
            return;
        }
        let picked = self
            .units
            .values()
            .find(|u| u.owner == self.local && !u.is_defeated() && u.contains_point(point))
            .map(|u| u.id);
        let Some(id) = picked else {
            return;
        };
        if let Some(unit) = self.units.get_mut(&id) {
            unit.begin_charge();
            self.charging = Some(id);
            debug!(unit = %id, "Charge started");
        }
    }

    fn on_pointer_move(&mut self, point: Vec2) {
        let Some(id) = self.charging else {
            return;
        };
        if !self.can_act(&self.local) {
            self.cancel_charge();
            return;
        }
        let Some(unit) = self.units.get_mut(&id) else {
            self.charging = None;
            return;
        };
        let Some(charge) = unit.drag_to(point) else {
            return;
        };
        self.authority.on_aim(unit, &mut self.outbox);

        let points = self.predict(id, &charge);
        self.emit(MatchEvent::DragIndicator {
            unit: id,
            from: charge.start,
            to: charge.current,
            charge: charge.amount(),
        });
        self.emit(MatchEvent::TrajectoryPreview { unit: id, points });
    }

    fn on_pointer_up(&mut self, point: Vec2) -> bool {
        let Some(id) = self.charging.take() else {
            return false;
        };
        self.emit(MatchEvent::PreviewCleared { unit: id });

        let allowed = self.can_act(&self.local);
        let Some(unit) = self.units.get_mut(&id) else {
            return false;
        };
        if !allowed {
            unit.cancel_charge();
            return false;
        }
        let Some(velocity) = unit.release(point) else {
            debug!(unit = %id, "Drag too short, shot cancelled");
            return false;
        };

        self.authority.apply_launch(unit, velocity, &mut self.outbox);
        info!(unit = %id, vx = velocity.x, vy = velocity.y, "Launched");
        self.set_phase(MatchPhase::PlayingOut);
        true
    }

    fn cancel_charge(&mut self) {
        if let Some(id) = self.charging.take() {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.cancel_charge();
            }
            self.emit(MatchEvent::PreviewCleared { unit: id });
        }
    }

    fn predict(&self, caster: UnitId, charge: &Charge) -> Vec<Vec2> {
        let bodies: Vec<Body> = self.units.values().map(|u| u.body).collect();
        trajectory::predict(
            self.physics.as_ref(),
            &bodies,
            caster,
            charge.start,
            charge.launch_velocity(),
        )
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advance one fixed step
    pub fn tick(&mut self) {
        self.tick += 1;

        if !self.is_over() {
            self.step_simulation();
        }

        for deferred in self.scheduler.advance() {
            self.run_deferred(deferred);
        }

        if self.role == Role::Host {
            self.poll_settle();
        }
    }

    /// Ended or closed: the field is frozen and nothing is replicated
    fn is_over(&self) -> bool {
        matches!(self.phase, MatchPhase::Ended | MatchPhase::Closed)
    }

    fn step_simulation(&mut self) {
        let mut bodies: Vec<Body> = self.units.values().map(|u| u.body).collect();
        let contacts = self
            .authority
            .step_world(self.physics.as_mut(), &mut bodies, tick_delta());
        for body in bodies {
            if let Some(unit) = self.units.get_mut(&body.id) {
                unit.body = body;
            }
        }

        for contact in contacts {
            self.resolve_contact(contact);
        }

        for unit in self.units.values_mut() {
            self.authority.on_tick(unit, &mut self.outbox);
        }
    }

    fn resolve_contact(&mut self, contact: Contact) {
        let effect = match contact.other {
            ContactTarget::Unit(other_id) => {
                let (Some(mover), Some(other)) = (self.units.get(&contact.unit), self.units.get(&other_id))
                else {
                    return;
                };
                self.authority.on_collision(mover, other, contact.speed)
            }
            ContactTarget::Obstacle(index) => {
                let (Some(unit), Some(obstacle)) = (self.units.get(&contact.unit), self.arena.obstacle(index))
                else {
                    return;
                };
                self.authority.on_obstacle(unit, obstacle.kind)
            }
            ContactTarget::Wall(_) => None,
        };

        if let Some(effect) = effect {
            self.apply_contact_effect(effect);
        }
    }

    fn apply_contact_effect(&mut self, effect: ContactEffect) {
        if self.is_over() {
            return;
        }
        match effect {
            ContactEffect::Damage { target, amount, cause } => self.apply_damage(target, amount, cause),
            ContactEffect::ApplyEffect { target, effect } => {
                let changed = self
                    .units
                    .get_mut(&target)
                    .map(|unit| unit.apply_effect(&effect))
                    .unwrap_or(false);
                if changed {
                    debug!(unit = %target, effect = %effect.name, "Effect applied");
                    self.publish_stats(target);
                }
            }
            ContactEffect::Boost {
                target,
                attack,
                speed_factor,
            } => {
                if let Some(unit) = self.units.get_mut(&target) {
                    unit.boost(attack, speed_factor);
                    self.publish_stats(target);
                }
            }
        }
    }

    /// Deal damage on the host. Lethal damage starts the defeat ceremony;
    /// the respawn and score follow after `DEFEAT_CEREMONY_SECS`.
    pub fn apply_damage(&mut self, target: UnitId, amount: i32, cause: DefeatCause) {
        if self.role != Role::Host {
            warn!(unit = %target, "Only the host deals damage");
            return;
        }
        if self.is_over() {
            debug!(unit = %target, "Match over, ignoring damage");
            return;
        }
        let Some(unit) = self.units.get_mut(&target) else {
            warn!(unit = %target, "Damage for an unknown unit");
            return;
        };

        match unit.apply_damage(amount) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hit { hp } => {
                debug!(unit = %target, amount, hp, "Unit hit");
                self.publish_stats(target);
            }
            DamageOutcome::Defeated => {
                info!(unit = %target, ?cause, "Unit defeated");
                if self.charging == Some(target) {
                    self.cancel_charge();
                }
                self.outbox.push(PeerMsg::UnitDefeat { id: target });
                self.emit(MatchEvent::DefeatCeremony { unit: target });
                self.scheduler.schedule(
                    secs_to_ticks(DEFEAT_CEREMONY_SECS),
                    Deferred::ResolveDefeat { unit: target, cause },
                );
            }
        }
    }

    /// Respawn a defeated unit and credit the opponent
    fn resolve_defeat(&mut self, id: UnitId, cause: DefeatCause) {
        if self.is_over() {
            return;
        }
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };
        let scorer = if unit.owner == self.host {
            self.guest.clone()
        } else {
            self.host.clone()
        };
        let credited = match cause {
            DefeatCause::Unit(attacker) => attacker,
            DefeatCause::Hazard(_) => id,
        };

        unit.respawn();
        let delta = unit.take_replica_delta();
        if let Some(pos) = delta.position {
            self.outbox.push(PeerMsg::UnitPosition { id, pos: pos.into() });
        }
        if let Some(rotation) = delta.rotation {
            self.outbox.push(PeerMsg::UnitRotation { id, rotation });
        }
        self.publish_stats(id);

        self.scores.add_score(&scorer, credited, 1);
        self.outbox.push(PeerMsg::ScoreUpdate {
            player_id: scorer.clone(),
            floatie_id: credited,
            increment: 1,
        });
        let total = self.scores.player_score(&scorer);
        info!(player = %scorer, unit = %credited, total, "Score");
        self.emit(MatchEvent::ScoreChanged {
            player: scorer,
            unit: credited,
            total,
        });

        if let Some(winner) = self.scores.winner().cloned() {
            self.outbox.push(PeerMsg::End { winner: winner.clone() });
            self.finish_match(winner);
        }
    }

    fn publish_stats(&mut self, id: UnitId) {
        let Some(unit) = self.units.get(&id) else {
            return;
        };
        let (hp, attack) = (unit.hp(), unit.attack());
        if self.role == Role::Host {
            self.outbox.push(PeerMsg::UnitStats { id, hp, attack });
        }
        self.emit(MatchEvent::UnitStatsChanged { unit: id, hp, attack });
    }

    /// Host: once the field is still and no defeat is pending, hand the
    /// turn to the next player
    fn poll_settle(&mut self) {
        if self.phase != MatchPhase::PlayingOut {
            return;
        }
        if self.units.values().any(|u| u.speed() > SETTLE_EPSILON) {
            return;
        }
        if self
            .scheduler
            .any(|d| matches!(d, Deferred::ResolveDefeat { .. }))
        {
            return;
        }

        self.turns.advance_turn();
        self.outbox.push(PeerMsg::TurnAdvance);
        self.set_phase(MatchPhase::Idle);
        self.emit_turn_changed();
    }

    fn run_deferred(&mut self, deferred: Deferred) {
        match deferred {
            Deferred::ResolveDefeat { unit, cause } => self.resolve_defeat(unit, cause),
            Deferred::RevealCoinFlip => {
                let local_starts = self.turns.is_my_turn(&self.local);
                self.emit(MatchEvent::CoinFlipRevealed { local_starts });
            }
            Deferred::DismissCoinFlip => {
                if self.phase == MatchPhase::CoinFlip {
                    self.set_phase(MatchPhase::Idle);
                    self.emit_turn_changed();
                }
            }
            Deferred::RematchPrompt => {
                if self.phase == MatchPhase::Ended {
                    self.emit(MatchEvent::RematchPrompt);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // End of match
    // ------------------------------------------------------------------

    fn finish_match(&mut self, winner: PlayerId) {
        if self.is_over() {
            return;
        }
        self.cancel_charge();
        self.set_phase(MatchPhase::Ended);
        let local_won = winner == self.local;
        info!(winner = %winner, local_won, "Match over");
        self.emit(MatchEvent::MatchEnded { winner, local_won });
        self.scheduler
            .schedule(secs_to_ticks(REMATCH_PROMPT_SECS), Deferred::RematchPrompt);
    }

    /// Answer the rematch prompt
    pub fn request_rematch(&mut self, accept: bool) {
        if self.phase != MatchPhase::Ended {
            debug!(phase = ?self.phase, "No match to rematch");
            return;
        }
        if accept {
            if self.rematch.local {
                return;
            }
            self.rematch.local = true;
            self.outbox.push(PeerMsg::RematchAccept);
            self.try_restart();
        } else {
            self.outbox.push(PeerMsg::RematchDecline);
            self.close(false);
        }
    }

    fn on_remote_rematch(&mut self, accept: bool) {
        if self.phase != MatchPhase::Ended {
            warn!(phase = ?self.phase, "Rematch answer outside of a finished match");
            return;
        }
        if accept {
            self.rematch.remote = true;
            self.try_restart();
        } else {
            self.close(true);
        }
    }

    fn try_restart(&mut self) {
        if !(self.rematch.local && self.rematch.remote) {
            return;
        }
        self.rematch = RematchVotes::default();
        self.scheduler.clear();
        self.scores.reset();
        for unit in self.units.values_mut() {
            unit.respawn();
            let stats = UnitStats::for_side(unit.id.side);
            unit.set_replicated_stats(stats.max_hp, stats.attack);
            unit.take_replica_delta();
        }

        let players = vec![self.host.clone(), self.guest.clone()];
        match TurnState::with_random_holder(players, &mut self.rng) {
            Ok(turns) => self.turns = turns,
            Err(e) => {
                warn!(error = %e, "Could not reset turn order");
                return;
            }
        }

        info!("Rematch");
        self.emit(MatchEvent::RematchStarted);
        self.set_phase(MatchPhase::WaitingForOpponent);
        if self.role == Role::Host {
            self.begin_coin_flip();
        }
    }

    fn close(&mut self, by_opponent: bool) {
        self.scheduler.clear();
        self.set_phase(MatchPhase::Closed);
        self.emit(MatchEvent::MatchClosed { by_opponent });
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    fn set_phase(&mut self, phase: MatchPhase) {
        if self.phase == phase {
            return;
        }
        debug!(from = ?self.phase, to = ?phase, "Phase change");
        self.phase = phase;
        self.emit(MatchEvent::PhaseChanged(phase));
    }

    fn emit_turn_changed(&mut self) {
        let current = self.turns.current_player().clone();
        let local_turn = current == self.local;
        self.emit(MatchEvent::TurnChanged {
            current,
            turn_count: self.turns.turn_count(),
            local_turn,
        });
    }

    fn emit(&mut self, event: MatchEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }
}
