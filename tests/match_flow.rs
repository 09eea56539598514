//! Host and guest controllers wired back-to-back through their outboxes

use glam::Vec2;

use slam_duel::game::arena::{Arena, ArenaBounds};
use slam_duel::game::combat::DefeatCause;
use slam_duel::game::r#match::{COIN_FLIP_DISMISS_SECS, DEFEAT_CEREMONY_SECS, REMATCH_PROMPT_SECS};
use slam_duel::game::{EventLog, MatchController, MatchEvent, MatchPhase, MatchSetup, Role};
use slam_duel::util::time::secs_to_ticks;
use slam_duel::ws::protocol::{PeerMsg, PlayerId, Side, UnitId};

fn a() -> PlayerId {
    PlayerId::new("A")
}

fn b() -> PlayerId {
    PlayerId::new("B")
}

fn setup(role: Role, seed: u64, arena: Arena) -> MatchSetup {
    MatchSetup {
        role,
        host: a(),
        guest: b(),
        arena,
        win_threshold: 5,
        seed,
    }
}

/// First seed whose coin flip gives `first` the opening turn
fn seed_where_first(first: &PlayerId) -> u64 {
    (0..256)
        .find(|seed| {
            let host = MatchController::new(setup(Role::Host, *seed, Arena::default())).unwrap();
            host.turns().current_player() == first
        })
        .expect("some seed picks each player")
}

struct Duel {
    host: MatchController,
    guest: MatchController,
    host_log: EventLog,
    guest_log: EventLog,
    /// Everything the host sent, in order
    host_sent: Vec<PeerMsg>,
}

impl Duel {
    fn new(seed: u64, arena: Arena) -> Self {
        let mut host = MatchController::new(setup(Role::Host, seed, arena.clone())).unwrap();
        let mut guest = MatchController::new(setup(Role::Guest, seed, arena)).unwrap();
        let host_log = EventLog::new();
        let guest_log = EventLog::new();
        host.subscribe(Box::new(host_log.clone()));
        guest.subscribe(Box::new(guest_log.clone()));
        Self {
            host,
            guest,
            host_log,
            guest_log,
            host_sent: Vec::new(),
        }
    }

    /// Connected and past the coin flip
    fn started(seed: u64, arena: Arena) -> Self {
        let mut duel = Self::new(seed, arena);
        duel.host.start();
        duel.guest.start();
        duel.pump();
        duel.step(secs_to_ticks(COIN_FLIP_DISMISS_SECS));
        duel
    }

    fn pump(&mut self) {
        loop {
            let from_host = self.host.drain_outbox();
            let from_guest = self.guest.drain_outbox();
            if from_host.is_empty() && from_guest.is_empty() {
                break;
            }
            for msg in from_host {
                self.host_sent.push(msg.clone());
                self.guest.handle_message(msg);
            }
            for msg in from_guest {
                self.host.handle_message(msg);
            }
        }
    }

    fn step(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.host.tick();
            self.guest.tick();
            self.pump();
        }
    }

    /// Tick until the host hands over the turn
    fn play_out(&mut self) {
        for _ in 0..600 {
            if !self.host.is_playing_out() {
                return;
            }
            self.step(1);
        }
        panic!("shot never settled");
    }

    fn defeat(&mut self, victim: UnitId, attacker: UnitId) {
        self.host.apply_damage(victim, 500, DefeatCause::Unit(attacker));
        self.pump();
        self.step(secs_to_ticks(DEFEAT_CEREMONY_SECS));
    }
}

fn open_arena() -> Arena {
    Arena::empty(ArenaBounds::new(Vec2::new(125.0, 125.0), Vec2::new(1030.0, 550.0)))
}

#[test]
fn test_coin_flip_agrees_on_first_mover() {
    let duel = Duel::started(7, Arena::default());

    assert_eq!(duel.host.phase(), MatchPhase::Idle);
    assert_eq!(duel.guest.phase(), MatchPhase::Idle);
    assert_eq!(
        duel.host.turns().current_player(),
        duel.guest.turns().current_player()
    );
    assert!(matches!(duel.host_sent[0], PeerMsg::CoinFlip { .. }));

    let host_starts = duel.host.turns().is_my_turn(&a());
    let guest_events = duel.guest_log.snapshot();
    assert!(guest_events.contains(&MatchEvent::CoinFlipRevealed {
        local_starts: !host_starts
    }));
    assert!(duel
        .host_log
        .snapshot()
        .contains(&MatchEvent::CoinFlipRevealed {
            local_starts: host_starts
        }));
}

#[test]
fn test_guest_shot_runs_on_host_and_passes_turn() {
    let mut duel = Duel::started(seed_where_first(&b()), Arena::default());
    let id = UnitId::new(Side::Guest, 1);
    let start = duel.host.unit(id).unwrap().position();

    assert!(duel.guest.shoot(1, Vec2::new(-30.0, 0.0)));
    let intents = duel.guest.drain_outbox();
    assert!(intents.iter().any(|m| matches!(m, PeerMsg::UnitAim { .. })));
    assert_eq!(
        intents.last(),
        Some(&PeerMsg::ReleaseCharge {
            id,
            vel: Vec2::new(300.0, 0.0).into(),
        })
    );
    for msg in intents {
        duel.host.handle_message(msg);
    }
    assert!(duel.host.is_playing_out());

    duel.play_out();

    assert_eq!(duel.host.phase(), MatchPhase::Idle);
    assert_eq!(duel.guest.phase(), MatchPhase::Idle);
    assert_eq!(duel.host.turns().current_player(), &a());
    assert_eq!(duel.guest.turns().current_player(), &a());
    assert_eq!(duel.guest.turns().turn_count(), 1);

    let host_pos = duel.host.unit(id).unwrap().position();
    assert!(host_pos.x > start.x);
    assert_eq!(duel.guest.unit(id).unwrap().position(), host_pos);
}

#[test]
fn test_guest_cannot_shoot_on_host_turn() {
    let mut duel = Duel::started(seed_where_first(&a()), Arena::default());
    assert!(!duel.guest.shoot(0, Vec2::new(-50.0, 0.0)));
    assert!(duel.guest.drain_outbox().is_empty());
    assert_eq!(duel.guest.phase(), MatchPhase::Idle);
}

#[test]
fn test_ram_deals_attack_damage() {
    let mut duel = Duel::started(seed_where_first(&a()), open_arena());
    let target = UnitId::new(Side::Guest, 0);

    assert!(duel.host.shoot(0, Vec2::new(-120.0, 0.0)));
    duel.pump();
    duel.play_out();

    assert_eq!(duel.host.unit(target).unwrap().hp(), 80);
    assert_eq!(duel.guest.unit(target).unwrap().hp(), 80);
    assert_eq!(duel.host.unit(UnitId::new(Side::Host, 0)).unwrap().hp(), 100);
    assert!(duel.guest_log.snapshot().contains(&MatchEvent::UnitStatsChanged {
        unit: target,
        hp: 80,
        attack: 20,
    }));
    assert_eq!(duel.guest.turns().current_player(), &b());
}

#[test]
fn test_spike_pillar_hurts_the_shooter() {
    let mut duel = Duel::started(seed_where_first(&a()), Arena::default());
    let id = UnitId::new(Side::Host, 1);

    assert!(duel.host.shoot(1, Vec2::new(-60.0, 0.0)));
    duel.pump();
    duel.play_out();

    assert_eq!(duel.host.unit(id).unwrap().hp(), 97);
    assert_eq!(duel.guest.unit(id).unwrap().hp(), 97);
}

#[test]
fn test_five_defeats_end_the_match() {
    let mut duel = Duel::started(3, Arena::default());
    let attacker = UnitId::new(Side::Guest, 0);

    for round in 0..5u8 {
        duel.defeat(UnitId::new(Side::Host, round % 3), attacker);
    }

    assert_eq!(duel.host.phase(), MatchPhase::Ended);
    assert_eq!(duel.guest.phase(), MatchPhase::Ended);
    assert_eq!(duel.host_sent.last(), Some(&PeerMsg::End { winner: b() }));
    assert_eq!(duel.host.scores().player_score(&b()), 5);
    assert_eq!(duel.guest.scores().player_score(&b()), 5);
    assert_eq!(duel.guest.scores().unit_score(&b(), attacker), 5);
    assert!(duel.guest_log.snapshot().contains(&MatchEvent::MatchEnded {
        winner: b(),
        local_won: true,
    }));
    assert!(duel.host_log.snapshot().contains(&MatchEvent::MatchEnded {
        winner: b(),
        local_won: false,
    }));

    // Nothing follows the end message
    let sent = duel.host_sent.len();
    duel.step(secs_to_ticks(REMATCH_PROMPT_SECS) + 30);
    assert_eq!(duel.host_sent.len(), sent);
    assert!(duel.guest_log.snapshot().contains(&MatchEvent::RematchPrompt));
}

#[test]
fn test_defeat_on_the_final_point_skips_later_respawns() {
    let mut duel = Duel::started(3, Arena::default());
    let attacker = UnitId::new(Side::Guest, 0);
    for round in 0..4u8 {
        duel.defeat(UnitId::new(Side::Host, round % 3), attacker);
    }

    // Two knockouts in the same shot; the first one decides the match
    duel.host.apply_damage(UnitId::new(Side::Host, 1), 500, DefeatCause::Unit(attacker));
    duel.step(1);
    duel.host.apply_damage(UnitId::new(Side::Host, 2), 500, DefeatCause::Unit(attacker));
    duel.step(secs_to_ticks(DEFEAT_CEREMONY_SECS) + 5);

    assert_eq!(duel.host.phase(), MatchPhase::Ended);
    assert_eq!(duel.host_sent.last(), Some(&PeerMsg::End { winner: b() }));
    assert_eq!(duel.guest.scores().player_score(&b()), 5);
}

#[test]
fn test_field_freezes_once_the_match_ends() {
    let mut duel = Duel::started(3, open_arena());
    let attacker = UnitId::new(Side::Guest, 0);
    for round in 0..5u8 {
        duel.defeat(UnitId::new(Side::Host, round % 3), attacker);
    }
    assert_eq!(duel.host.phase(), MatchPhase::Ended);
    let sent = duel.host_sent.len();

    // A unit still sliding toward an opponent after the final point
    let mover = UnitId::new(Side::Host, 0);
    let target = UnitId::new(Side::Guest, 0);
    let toward = duel.host.unit(target).unwrap().position() - duel.host.unit(mover).unwrap().position();
    duel.host.unit_mut(mover).unwrap().body.velocity = toward.normalize() * 1500.0;
    duel.step(60);

    assert_eq!(duel.host_sent.len(), sent);
    assert_eq!(duel.host_sent.last(), Some(&PeerMsg::End { winner: b() }));
    assert_eq!(duel.host.unit(target).unwrap().hp(), 100);
    assert_eq!(duel.guest.unit(target).unwrap().hp(), 100);
    assert!(duel.guest.units().all(|u| !u.is_defeated()));
}

#[test]
fn test_rematch_resets_both_peers() {
    let mut duel = Duel::started(3, Arena::default());
    let attacker = UnitId::new(Side::Host, 2);
    for round in 0..5u8 {
        duel.defeat(UnitId::new(Side::Guest, round % 3), attacker);
    }
    assert_eq!(duel.guest.phase(), MatchPhase::Ended);

    duel.guest.request_rematch(true);
    duel.pump();
    assert_eq!(duel.host.phase(), MatchPhase::Ended);

    duel.host.request_rematch(true);
    duel.pump();
    assert_eq!(duel.host.phase(), MatchPhase::CoinFlip);
    assert_eq!(duel.guest.phase(), MatchPhase::CoinFlip);
    assert_eq!(duel.host.scores().player_score(&a()), 0);
    assert_eq!(duel.guest.scores().player_score(&a()), 0);
    assert!(duel.guest_log.snapshot().contains(&MatchEvent::RematchStarted));

    duel.step(secs_to_ticks(COIN_FLIP_DISMISS_SECS));
    assert_eq!(duel.host.phase(), MatchPhase::Idle);
    assert_eq!(duel.guest.phase(), MatchPhase::Idle);
    assert_eq!(
        duel.host.turns().current_player(),
        duel.guest.turns().current_player()
    );
    for unit in duel.guest.units() {
        assert_eq!(unit.hp(), unit.max_hp());
        assert_eq!(unit.position(), unit.spawn());
    }
}

#[test]
fn test_decline_closes_both_peers() {
    let mut duel = Duel::started(3, Arena::default());
    let attacker = UnitId::new(Side::Guest, 1);
    for round in 0..5u8 {
        duel.defeat(UnitId::new(Side::Host, round % 3), attacker);
    }

    duel.guest.request_rematch(false);
    duel.pump();

    assert_eq!(duel.guest.phase(), MatchPhase::Closed);
    assert_eq!(duel.host.phase(), MatchPhase::Closed);
    assert!(duel
        .host_log
        .snapshot()
        .contains(&MatchEvent::MatchClosed { by_opponent: true }));
    assert!(duel
        .guest_log
        .snapshot()
        .contains(&MatchEvent::MatchClosed { by_opponent: false }));
}
