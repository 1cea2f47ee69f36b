//! Tests for the simulation engine, attack strategies, and round flow.

use std::cell::RefCell;
use std::rc::Rc;

use hecs::World;
use proptest::prelude::*;

use lanewar_core::commands::Command;
use lanewar_core::components::{AiController, Health, Lifecycle};
use lanewar_core::config::{CombatConfig, FormationLayout, WindupMode};
use lanewar_core::definitions::*;
use lanewar_core::enums::*;
use lanewar_core::events::PresentationEvent;
use lanewar_core::state::{GameStateSnapshot, UnitView};
use lanewar_core::types::{Position, UnitId, Velocity};

use crate::combat::{CombatCtx, ScoreState};
use crate::engine::{SimConfig, SimulationEngine};
use crate::navigation::Navigator;
use crate::obstacles::{Obstacle, ObstacleMap};
use crate::registry::SpatialRegistry;
use crate::systems::attack::build_chain;
use crate::systems::damage::apply_damage;
use crate::systems::formation;
use crate::world_setup::spawn_unit;

// ---- Helpers ----

fn config(windup: WindupMode) -> SimConfig {
    SimConfig {
        combat: CombatConfig {
            windup,
            approach_offset_radius: 0.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Hits land on the tick the attack starts.
fn instant() -> SimConfig {
    config(WindupMode::Timeline { secs: 0.0 })
}

fn external() -> SimConfig {
    config(WindupMode::External)
}

fn unit_def(id: &str, attack: AttackProfile, damage: u32, range: f32) -> UnitDefinition {
    let archetype = match attack {
        AttackProfile::Melee => Archetype::Melee,
        _ => Archetype::Ranged,
    };
    let mut def = UnitDefinition::new(id, archetype, attack);
    def.damage = damage;
    def.attack_range = range;
    def.soul_drop_chance = 0.0;
    def
}

/// A target that neither moves nor hurts.
fn dummy(id: &str) -> UnitDefinition {
    let mut def = unit_def(id, AttackProfile::Melee, 0, 1.2);
    def.move_speed = 0.0;
    def
}

fn engine(config: SimConfig, defs: &[UnitDefinition]) -> SimulationEngine {
    SimulationEngine::new(config, UnitCatalog::new(defs.to_vec()).unwrap())
}

fn view(snap: &GameStateSnapshot, id: UnitId) -> &UnitView {
    snap.units.iter().find(|u| u.id == id).unwrap()
}

fn has_event(snap: &GameStateSnapshot, pred: impl Fn(&PresentationEvent) -> bool) -> bool {
    snap.events.iter().any(pred)
}

fn level(rounds: usize, enemy: &str, count: u32, souls_reward: u32) -> LevelDefinition {
    LevelDefinition {
        name: "test-level".into(),
        rounds: (0..rounds)
            .map(|_| RoundDefinition {
                enemy_spawns: vec![EnemySpawnEntry {
                    unit: enemy.into(),
                    count,
                    level: 1,
                }],
                player_picks: 1,
                souls_reward,
            })
            .collect(),
    }
}

/// Tick until a terminal phase, picking `pick` whenever planning needs it.
fn play_out(engine: &mut SimulationEngine, pick: &str, max_ticks: usize) -> Vec<GameStateSnapshot> {
    let mut snaps = Vec::new();
    for _ in 0..max_ticks {
        let snap = engine.tick();
        let needs_pick = snap.phase == RoundPhase::Planning && snap.picks_done < snap.picks_required;
        let done = snap.phase.is_terminal();
        snaps.push(snap);
        if done {
            break;
        }
        if needs_pick {
            engine.queue_command(Command::PickUnit {
                definition_id: pick.into(),
            });
        }
    }
    snaps
}

// ---- Unit AI scenarios ----

#[test]
fn test_out_of_range_unit_approaches_without_attacking() {
    let mut attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.0);
    attacker.move_speed = 2.0;
    let mut eng = engine(instant(), &[attacker.clone(), dummy("dummy")]);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(2.0, 0.0));
    eng.start_test_battle();

    let snap = eng.tick();
    let av = view(&snap, a);
    assert_eq!(av.ai_state, AiState::Approaching);
    assert!(av.moving);
    assert!(!av.facing_left);
    assert!(av.position.x() > 0.0 && av.position.x() < 0.1);
    assert!(eng.pending_intent(a).is_none());
    assert_eq!(eng.unit_health(e), Some(100));
    assert!(has_event(&snap, |ev| matches!(
        ev,
        PresentationEvent::MovingChanged { unit, moving: true } if *unit == a
    )));
    assert!(!has_event(&snap, |ev| matches!(ev, PresentationEvent::AttackStarted { .. })));
}

#[test]
fn test_melee_attack_then_resolve_hit_deals_exact_damage() {
    let attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(external(), &[attacker.clone(), dummy("dummy")]);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert_eq!(view(&snap, a).ai_state, AiState::Engaging);
    let intent = eng.pending_intent(a).unwrap();
    assert_eq!(intent.target, e);
    assert_eq!(eng.unit_health(e), Some(100), "phase 1 must not deal damage");

    eng.queue_command(Command::ResolveHit { unit: a });
    eng.tick();
    assert_eq!(eng.unit_health(e), Some(90));
    assert!(eng.pending_intent(a).is_none());

    // A second resolve for the same intent is a no-op.
    eng.queue_command(Command::ResolveHit { unit: a });
    eng.tick();
    assert_eq!(eng.unit_health(e), Some(90));
}

#[test]
fn test_cooldown_gates_attack_starts() {
    let attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(instant(), &[attacker.clone(), dummy("dummy")]);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    let mut starts = 0;
    // 1.5 seconds at 30 Hz: one start at t=0 and one at t=1.0.
    for _ in 0..45 {
        let snap = eng.tick();
        starts += snap
            .events
            .iter()
            .filter(|ev| matches!(ev, PresentationEvent::AttackStarted { unit, .. } if *unit == a))
            .count();
    }
    assert_eq!(starts, 2);
}

#[test]
fn test_timeline_windup_delays_damage() {
    let attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(
        config(WindupMode::Timeline { secs: 0.35 }),
        &[attacker.clone(), dummy("dummy")],
    );
    eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    for _ in 0..5 {
        eng.tick();
    }
    assert_eq!(eng.unit_health(e), Some(100));
    for _ in 0..10 {
        eng.tick();
    }
    assert_eq!(eng.unit_health(e), Some(90));
}

#[test]
fn test_cooldown_shorter_than_windup_still_lands_hits() {
    let mut attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    attacker.attack_cooldown = 0.2;
    let mut eng = engine(
        config(WindupMode::Timeline { secs: 0.35 }),
        &[attacker.clone(), dummy("dummy")],
    );
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    // Starts at t=0, 0.4 and 0.8; hits land at 0.35 and 0.75.
    let mut starts = 0;
    for _ in 0..30 {
        let snap = eng.tick();
        starts += snap
            .events
            .iter()
            .filter(|ev| matches!(ev, PresentationEvent::AttackStarted { unit, .. } if *unit == a))
            .count();
    }
    assert_eq!(starts, 3);
    assert_eq!(eng.unit_health(e), Some(80));
}

#[test]
fn test_line_of_sight_blocks_engagement() {
    let attacker = unit_def("archer", AttackProfile::ranged(), 10, 3.0);
    let wall = ObstacleMap::new(vec![Obstacle::Rect {
        min: [-2.0, -0.2],
        max: [2.0, 0.2],
    }]);
    let mut eng = engine(instant(), &[attacker.clone(), dummy("dummy")]).with_obstacles(wall);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, -1.0));
    eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.0, 1.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert_eq!(view(&snap, a).ai_state, AiState::Approaching);
    assert!(eng.pending_intent(a).is_none());
}

#[test]
fn test_facing_follows_target_side() {
    let attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(external(), &[attacker.clone(), dummy("dummy")]);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(-0.5, 0.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert!(view(&snap, a).facing_left);
}

#[test]
fn test_disabled_units_stay_suppressed() {
    let attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(instant(), &[attacker.clone(), dummy("dummy")]);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(3.0, 0.0));
    // No battle started: the engine is idle and AI stays off.
    let snap = eng.tick();
    assert_eq!(view(&snap, a).ai_state, AiState::Suppressed);
    assert_eq!(snap.time.tick, 0);
}

// ---- Attack strategies ----

#[test]
fn test_chain_hits_primary_full_and_bounce_half() {
    let chain = AttackProfile::Chain {
        chain_range: 3.0,
        max_bounces: 1,
        secondary_multiplier: 0.5,
    };
    let mage = unit_def("mage", chain, 20, 5.0);
    let mut eng = engine(instant(), &[mage.clone(), dummy("dummy")]);
    let m = eng.spawn_test_unit(&mage, Team::Ally, Position::new(0.0, 0.0));
    let primary = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(1.0, 0.0));
    let second = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(2.5, 0.0));
    let far = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(4.0, 0.0));

    eng.start_test_battle();
    let snap = eng.tick();

    assert_eq!(eng.unit_health(primary), Some(80));
    assert_eq!(eng.unit_health(second), Some(90));
    assert_eq!(eng.unit_health(far), Some(100), "max_bounces=1 stops after one hop");
    assert!(has_event(&snap, |ev| matches!(
        ev,
        PresentationEvent::ChainLightning { attacker, links }
            if *attacker == m && links == &vec![primary, second]
    )));
}

#[test]
fn test_chain_without_neighbour_hits_primary_only() {
    let mage = unit_def("mage", AttackProfile::chain(), 20, 5.0);
    let mut eng = engine(instant(), &[mage.clone(), dummy("dummy")]);
    eng.spawn_test_unit(&mage, Team::Ally, Position::new(0.0, 0.0));
    let primary = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(1.0, 0.0));
    let far = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(1.0, 10.0));
    eng.start_test_battle();
    eng.tick();

    assert_eq!(eng.unit_health(primary), Some(80));
    assert_eq!(eng.unit_health(far), Some(100));
}

#[test]
fn test_splash_spares_allies_and_halves_for_bystanders() {
    let meteor = AttackProfile::AreaSplash {
        fall_speed: 10.0,
        impact_radius: 0.2,
        splash_radius: 1.5,
        splash_fraction: 0.5,
        spawn_height: 5.0,
    };
    let warlock = unit_def("warlock", meteor, 30, 10.0);
    let mut eng = engine(instant(), &[warlock.clone(), dummy("dummy")]);
    eng.spawn_test_unit(&warlock, Team::Ally, Position::new(0.0, -5.0));
    let primary = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.0, 0.0));
    let bystander = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(1.0, 0.0));
    let friend = eng.spawn_test_unit(&dummy("dummy"), Team::Ally, Position::new(-1.0, 0.0));
    eng.start_test_battle();

    let mut impacts = 0;
    for _ in 0..20 {
        let snap = eng.tick();
        impacts += snap
            .events
            .iter()
            .filter(|ev| matches!(ev, PresentationEvent::ProjectileImpact { kind: ProjectileKind::Meteor, .. }))
            .count();
    }
    assert_eq!(impacts, 1);
    assert_eq!(eng.unit_health(primary), Some(70));
    assert_eq!(eng.unit_health(bystander), Some(85));
    assert_eq!(eng.unit_health(friend), Some(100));
}

#[test]
fn test_ranged_projectile_homes_and_hits() {
    let archer = unit_def("archer", AttackProfile::ranged(), 12, 5.0);
    let mut eng = engine(instant(), &[archer.clone(), dummy("dummy")]);
    eng.spawn_test_unit(&archer, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.0, 4.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert_eq!(snap.projectiles.len(), 1);
    assert_eq!(eng.unit_health(e), Some(100));

    for _ in 0..20 {
        eng.tick();
    }
    assert_eq!(eng.unit_health(e), Some(88));
}

#[test]
fn test_projectile_flight_starts_the_tick_after_launch() {
    let archer = unit_def("archer", AttackProfile::ranged(), 12, 5.0);
    let mut eng = engine(instant(), &[archer.clone(), dummy("dummy")]);
    eng.spawn_test_unit(&archer, Team::Ally, Position::new(0.0, 0.0));
    eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.0, 4.0));
    eng.start_test_battle();

    let launch = eng.tick();
    assert_eq!(launch.projectiles.len(), 1);
    assert_eq!(launch.projectiles[0].position, Position::new(0.0, 0.0));

    let next = eng.tick();
    let y = next.projectiles[0].position.y();
    assert!(y > 0.2 && y < 0.3, "one step of 8/30, got {y}");
}

#[test]
fn test_projectile_with_dead_target_deals_no_damage() {
    let archer = unit_def("archer", AttackProfile::ranged(), 10, 5.0);
    let brute = unit_def("brute", AttackProfile::Melee, 200, 1.2);
    let mut eng = engine(instant(), &[archer.clone(), brute.clone(), dummy("dummy")]);
    eng.spawn_test_unit(&archer, Team::Ally, Position::new(0.0, -3.0));
    eng.spawn_test_unit(&brute, Team::Ally, Position::new(0.0, -0.5));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.0, 0.0));
    eng.start_test_battle();

    let mut launched = 0;
    let mut impacts = 0;
    let mut damage_events = 0;
    for _ in 0..30 {
        let snap = eng.tick();
        for ev in &snap.events {
            match ev {
                PresentationEvent::ProjectileLaunched { .. } => launched += 1,
                PresentationEvent::ProjectileImpact { .. } => impacts += 1,
                PresentationEvent::UnitDamaged { unit, .. } if *unit == e => damage_events += 1,
                _ => {}
            }
        }
        assert!(snap.projectiles.is_empty() || launched == 1);
    }
    assert_eq!(launched, 1);
    assert_eq!(impacts, 0);
    assert_eq!(damage_events, 1, "only the melee hit lands");
}

#[test]
fn test_resolve_hit_on_dead_target_is_noop() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let brute = unit_def("brute", AttackProfile::Melee, 500, 1.2);
    let mut eng = engine(external(), &[grunt.clone(), brute.clone(), dummy("dummy")]);
    let g = eng.spawn_test_unit(&grunt, Team::Ally, Position::new(-0.5, 0.0));
    let b = eng.spawn_test_unit(&brute, Team::Ally, Position::new(0.5, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.0, 0.5));
    eng.start_test_battle();

    eng.tick();
    assert!(eng.pending_intent(g).is_some());
    assert!(eng.pending_intent(b).is_some());

    eng.queue_commands([Command::ResolveHit { unit: b }, Command::ResolveHit { unit: g }]);
    let snap = eng.tick();
    assert_eq!(eng.unit_health(e), Some(0));
    assert!(eng.pending_intent(g).is_none());
    let hits_on_e = snap
        .events
        .iter()
        .filter(|ev| matches!(ev, PresentationEvent::UnitDamaged { unit, .. } if *unit == e))
        .count();
    assert_eq!(hits_on_e, 1);
}

#[test]
fn test_windup_expiry_drops_intent() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut cfg = external();
    cfg.combat.max_windup_secs = Some(0.1);
    let mut eng = engine(cfg, &[grunt.clone(), dummy("dummy")]);
    let g = eng.spawn_test_unit(&grunt, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    for _ in 0..10 {
        eng.tick();
    }
    assert!(eng.pending_intent(g).is_some());
    eng.queue_command(Command::ResolveHit { unit: g });
    eng.tick();
    assert_eq!(eng.unit_health(e), Some(100));
    assert!(eng.pending_intent(g).is_none());
}

// ---- Death, elimination and souls ----

#[test]
fn test_all_allies_dead_is_loss_and_ai_disabled() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let brute = unit_def("brute", AttackProfile::Melee, 200, 1.2);
    let mut eng = engine(instant(), &[grunt.clone(), brute.clone()]);
    let g = eng.spawn_test_unit(&grunt, Team::Ally, Position::new(0.0, 0.0));
    let b = eng.spawn_test_unit(&brute, Team::Enemy, Position::new(0.0, 1.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert_eq!(snap.phase, RoundPhase::MatchLost);
    assert_eq!(snap.outcome, Some(MatchOutcome::Lost));
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::MatchLost)));
    assert!(!view(&snap, g).alive);
    assert_eq!(eng.unit_health(b), Some(90));

    let mut query = eng.world().query::<&AiController>();
    for (_, ai) in query.iter() {
        assert!(!ai.enabled);
        assert_eq!(ai.state, AiState::Suppressed);
    }
}

#[test]
fn test_mutual_wipeout_counts_as_loss() {
    let archer = unit_def("archer", AttackProfile::ranged(), 200, 5.0);
    let mut eng = engine(instant(), &[archer.clone()]);
    eng.spawn_test_unit(&archer, Team::Ally, Position::new(0.0, -2.0));
    eng.spawn_test_unit(&archer, Team::Enemy, Position::new(0.0, 2.0));
    eng.start_test_battle();

    let mut last = eng.tick();
    for _ in 0..30 {
        if last.phase.is_terminal() {
            break;
        }
        last = eng.tick();
    }
    assert_eq!(last.phase, RoundPhase::MatchLost);
    assert!(last.units.iter().all(|u| !u.alive));
}

#[test]
fn test_dead_unit_leaves_registry_and_corpse_despawns() {
    let brute = unit_def("brute", AttackProfile::Melee, 500, 1.2);
    let mut eng = engine(instant(), &[brute.clone(), dummy("dummy")]);
    eng.spawn_test_unit(&brute, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::UnitDied { unit, .. } if *unit == e)));
    assert!(!eng.registry().is_live(e));
    assert_eq!(eng.unit_health(e), Some(0), "corpse lingers during grace");

    // Default grace is 2 seconds.
    for _ in 0..70 {
        eng.tick();
    }
    assert_eq!(eng.unit_health(e), None);
}

#[test]
fn test_enemy_death_drops_soul() {
    let brute = unit_def("brute", AttackProfile::Melee, 500, 1.2);
    let mut generous = dummy("pinata");
    generous.soul_drop_chance = 1.0;
    let mut eng = engine(instant(), &[brute.clone(), generous.clone()]);
    eng.spawn_test_unit(&brute, Team::Ally, Position::new(0.0, 0.0));
    eng.spawn_test_unit(&generous, Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();

    let snap = eng.tick();
    assert_eq!(snap.souls, 1);
    assert_eq!(snap.score.enemies_killed, 1);
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::SoulDropped { amount: 1, .. })));
}

// ---- Navigation ----

#[derive(Default)]
struct NavLog {
    destinations: Vec<(UnitId, Position)>,
}

struct MockNavigator {
    log: Rc<RefCell<NavLog>>,
    speed: f32,
}

impl Navigator for MockNavigator {
    fn set_destination(&mut self, unit: UnitId, destination: Position) {
        self.log.borrow_mut().destinations.push((unit, destination));
    }

    fn stop(&mut self, _unit: UnitId) {}

    fn velocity(&self, _unit: UnitId) -> Velocity {
        Velocity::new(self.speed, 0.0)
    }

    fn at_destination(&self, _unit: UnitId) -> bool {
        false
    }

    fn set_obstacle_mode(&mut self, _unit: UnitId, _obstacle: bool) {}
}

#[test]
fn test_navigator_drives_movement() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.0);
    let log = Rc::new(RefCell::new(NavLog::default()));
    let nav = MockNavigator {
        log: Rc::clone(&log),
        speed: 3.0,
    };
    let mut eng = engine(instant(), &[grunt.clone(), dummy("dummy")]).with_navigator(Box::new(nav));
    let g = eng.spawn_test_unit(&grunt, Team::Ally, Position::new(0.0, 0.0));
    eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(5.0, 0.0));
    eng.start_test_battle();

    eng.tick();
    let pos = eng.unit_position(g).unwrap();
    assert!((pos.x() - 0.1).abs() < 1e-4, "3 u/s for one 1/30 s tick");
    assert!(log
        .borrow()
        .destinations
        .iter()
        .any(|(unit, dest)| *unit == g && (dest.x() - 5.0).abs() < 1e-4));
}

// ---- Round flow ----

#[test]
fn test_start_level_enters_planning_with_wave() {
    let mut eng = engine(instant(), &[dummy("dummy"), unit_def("grunt", AttackProfile::Melee, 10, 1.2)]);
    eng.queue_command(Command::StartLevel {
        level: level(2, "dummy", 3, 0),
    });
    let snap = eng.tick();

    assert_eq!(snap.phase, RoundPhase::Planning);
    assert_eq!(snap.rounds_total, 2);
    assert_eq!(snap.picks_required, 1);
    assert_eq!(snap.units.iter().filter(|u| u.team == Team::Enemy).count(), 3);
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::LevelStarted { rounds: 2 })));
    assert!(snap.units.iter().all(|u| u.ai_state == AiState::Suppressed));
}

#[test]
fn test_quota_met_starts_battle_after_delay() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(instant(), &[dummy("dummy"), grunt]);
    eng.queue_commands([
        Command::StartLevel {
            level: level(1, "dummy", 1, 0),
        },
        Command::PickUnit {
            definition_id: "grunt".into(),
        },
    ]);
    let snap = eng.tick();
    assert_eq!(snap.picks_done, 1);
    assert!(snap.units.iter().any(|u| u.team == Team::Ally));

    for _ in 0..50 {
        assert_eq!(eng.tick().phase, RoundPhase::Planning);
    }
    let mut started = false;
    for _ in 0..20 {
        let snap = eng.tick();
        if has_event(&snap, |ev| matches!(ev, PresentationEvent::BattleStarted { round: 0 })) {
            started = true;
            assert!(snap.units.iter().all(|u| u.locked));
            break;
        }
    }
    assert!(started);
}

#[test]
fn test_commit_battle_skips_delay() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(instant(), &[dummy("dummy"), grunt]);
    eng.queue_commands([
        Command::StartLevel {
            level: level(1, "dummy", 1, 0),
        },
        Command::PickUnit {
            definition_id: "grunt".into(),
        },
        Command::CommitBattle,
    ]);
    let snap = eng.tick();
    assert_eq!(snap.phase, RoundPhase::Battle);
}

#[test]
fn test_pick_rejected_outside_planning_and_when_unaffordable() {
    let mut knight = unit_def("knight", AttackProfile::Melee, 10, 1.2);
    knight.soul_cost = 5;
    let mut eng = engine(instant(), &[dummy("dummy"), knight.clone()]);

    eng.queue_command(Command::PickUnit {
        definition_id: "knight".into(),
    });
    let snap = eng.tick();
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::CommandRejected { .. })));

    eng.queue_commands([
        Command::StartLevel {
            level: level(1, "dummy", 1, 0),
        },
        Command::PickUnit {
            definition_id: "knight".into(),
        },
    ]);
    let snap = eng.tick();
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::CommandRejected { .. })));
    assert_eq!(snap.picks_done, 0);
    assert_eq!(snap.souls, 0);
    assert!(snap.units.iter().all(|u| u.team == Team::Enemy));
}

#[test]
fn test_pick_spends_souls() {
    let mut knight = unit_def("knight", AttackProfile::Melee, 10, 1.2);
    knight.soul_cost = 5;
    let mut cfg = instant();
    cfg.combat.starting_souls = 7;
    let mut eng = engine(cfg, &[dummy("dummy"), knight]);
    eng.queue_commands([
        Command::StartLevel {
            level: level(1, "dummy", 1, 0),
        },
        Command::PickUnit {
            definition_id: "knight".into(),
        },
    ]);
    let snap = eng.tick();
    assert_eq!(snap.souls, 2);
    assert_eq!(snap.picks_done, 1);
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::SoulsChanged { balance: 2 })));
}

#[test]
fn test_placed_unit_keeps_position() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(instant(), &[dummy("dummy"), grunt]);
    eng.queue_commands([
        Command::StartLevel {
            level: level(1, "dummy", 1, 0),
        },
        Command::PlaceUnit {
            definition_id: "grunt".into(),
            position: Position::new(3.0, -1.0),
        },
        Command::PickUnit {
            definition_id: "grunt".into(),
        },
    ]);
    let snap = eng.tick();
    let placed = snap.units.iter().find(|u| u.locked && u.team == Team::Ally).unwrap();
    assert_eq!(placed.position, Position::new(3.0, -1.0));
    assert_eq!(snap.picks_done, 1, "placement does not count toward the quota");
}

#[test]
fn test_invalid_level_halts() {
    let mut eng = engine(instant(), &[dummy("dummy")]);
    eng.queue_command(Command::StartLevel {
        level: LevelDefinition {
            name: "empty".into(),
            rounds: Vec::new(),
        },
    });
    let snap = eng.tick();
    assert_eq!(snap.phase, RoundPhase::Halted);
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::LevelHalted { .. })));

    let mut eng = engine(instant(), &[dummy("dummy")]);
    eng.queue_command(Command::StartLevel {
        level: level(1, "ghost", 1, 0),
    });
    assert_eq!(eng.tick().phase, RoundPhase::Halted);
    // Halted engines do not advance.
    assert_eq!(eng.tick().time.tick, 0);
}

#[test]
fn test_full_match_win_with_roster_revival_and_rewards() {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut weak = dummy("weak");
    weak.max_health = 1;
    let mut eng = engine(SimConfig::default(), &[grunt, weak]);
    eng.queue_command(Command::StartLevel {
        level: level(2, "weak", 2, 3),
    });

    let snaps = play_out(&mut eng, "grunt", 3000);
    let last = snaps.last().unwrap();
    assert_eq!(last.phase, RoundPhase::MatchWon);
    assert_eq!(last.outcome, Some(MatchOutcome::Won));
    assert_eq!(last.souls, 6);
    assert_eq!(last.score.rounds_won, 2);
    assert_eq!(last.score.enemies_killed, 4);
    assert_eq!(eng.roster().len(), 2);

    let all_events: Vec<&PresentationEvent> = snaps.iter().flat_map(|s| &s.events).collect();
    assert!(all_events.iter().any(|ev| matches!(ev, PresentationEvent::RoundWon { round: 0 })));
    assert!(all_events.iter().any(|ev| matches!(ev, PresentationEvent::RoundWon { round: 1 })));
    assert!(all_events.iter().any(|ev| matches!(ev, PresentationEvent::UnitRevived { .. })));
    assert!(all_events.iter().any(|ev| matches!(ev, PresentationEvent::MatchWon)));
}

#[test]
fn test_planning_entry_resets_roster_and_combat_state() {
    let brute = unit_def(
        "brute",
        AttackProfile::Chain {
            chain_range: 10.0,
            max_bounces: 3,
            secondary_multiplier: 0.5,
        },
        500,
        20.0,
    );
    let stabber = unit_def("stabber", AttackProfile::Melee, 30, 20.0);
    let sniper = unit_def(
        "sniper",
        AttackProfile::Ranged {
            projectile_speed: 0.1,
            impact_radius: 0.2,
        },
        30,
        20.0,
    );
    let spawn = |unit: &str| EnemySpawnEntry {
        unit: unit.into(),
        count: 1,
        level: 1,
    };
    let two_rounds = LevelDefinition {
        name: "reset".into(),
        rounds: vec![
            RoundDefinition {
                enemy_spawns: vec![spawn("sniper"), spawn("stabber")],
                player_picks: 1,
                souls_reward: 0,
            },
            RoundDefinition {
                enemy_spawns: vec![spawn("stabber")],
                player_picks: 1,
                souls_reward: 0,
            },
        ],
    };
    let mut eng = engine(external(), &[brute, stabber, sniper]);
    eng.queue_commands([
        Command::StartLevel { level: two_rounds },
        Command::PickUnit {
            definition_id: "brute".into(),
        },
        Command::CommitBattle,
    ]);
    let battle = eng.tick();
    assert_eq!(battle.phase, RoundPhase::Battle);
    let id_of = |def: &str| {
        battle
            .units
            .iter()
            .find(|u| u.definition_id == def)
            .map(|u| u.id)
            .unwrap()
    };
    let (b, st, sn) = (id_of("brute"), id_of("stabber"), id_of("sniper"));
    assert!(eng.pending_intent(b).is_some());

    // The stabber wounds the brute, the sniper looses a slow shot at it,
    // then the brute's chain clears the wave in the same tick.
    eng.queue_commands([
        Command::ResolveHit { unit: st },
        Command::ResolveHit { unit: sn },
        Command::ResolveHit { unit: b },
    ]);
    let snap = eng.tick();
    assert!(has_event(&snap, |ev| matches!(
        ev,
        PresentationEvent::UnitDamaged { unit, remaining: 70, .. } if *unit == b
    )));
    assert!(has_event(&snap, |ev| matches!(
        ev,
        PresentationEvent::ProjectileLaunched { target, .. } if *target == b
    )));
    assert!(has_event(&snap, |ev| matches!(ev, PresentationEvent::UnitRevived { unit } if *unit == b)));

    assert_eq!(snap.phase, RoundPhase::Planning);
    assert_eq!(snap.round_index, 1);
    assert!(snap.projectiles.is_empty());
    let revived = view(&snap, b);
    assert!(revived.alive);
    assert_eq!(revived.health, revived.max_health);
    assert!(!revived.locked);
    assert_eq!(revived.ai_state, AiState::Suppressed);
    assert_eq!(revived.target, None);
    for unit in &snap.units {
        assert!(eng.pending_intent(unit.id).is_none());
    }
}

// ---- Determinism ----

fn skirmish_engine(seed: u64) -> SimulationEngine {
    let grunt = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let archer = unit_def("archer", AttackProfile::ranged(), 6, 4.0);
    let mut eng = SimulationEngine::new(
        SimConfig {
            seed,
            ..Default::default()
        },
        UnitCatalog::new(vec![grunt, archer]).unwrap(),
    );
    eng.queue_command(Command::StartLevel {
        level: LevelDefinition {
            name: "skirmish".into(),
            rounds: vec![RoundDefinition {
                enemy_spawns: vec![
                    EnemySpawnEntry {
                        unit: "grunt".into(),
                        count: 3,
                        level: 1,
                    },
                    EnemySpawnEntry {
                        unit: "archer".into(),
                        count: 2,
                        level: 2,
                    },
                ],
                player_picks: 3,
                souls_reward: 0,
            }],
        },
    });
    eng
}

#[test]
fn test_determinism_same_seed() {
    let mut engine_a = skirmish_engine(12345);
    let mut engine_b = skirmish_engine(12345);
    let snaps_a = play_out(&mut engine_a, "grunt", 600);
    let snaps_b = play_out(&mut engine_b, "grunt", 600);

    assert_eq!(snaps_a.len(), snaps_b.len());
    for (a, b) in snaps_a.iter().zip(&snaps_b) {
        let json_a = serde_json::to_string(a).unwrap();
        let json_b = serde_json::to_string(b).unwrap();
        assert_eq!(json_a, json_b, "Snapshots diverged with same seed");
    }
}

#[test]
fn test_determinism_different_seeds() {
    let snaps_a = play_out(&mut skirmish_engine(111), "grunt", 600);
    let snaps_b = play_out(&mut skirmish_engine(222), "grunt", 600);
    let diverged = snaps_a.iter().zip(&snaps_b).any(|(a, b)| {
        serde_json::to_string(a).unwrap() != serde_json::to_string(b).unwrap()
    });
    assert!(diverged, "Different seeds should produce divergent output");
}

// ---- Pause / time scale ----

#[test]
fn test_pause_stops_simulation() {
    let mut eng = engine(instant(), &[dummy("dummy")]);
    eng.queue_command(Command::StartLevel {
        level: level(1, "dummy", 1, 0),
    });
    eng.tick();
    eng.queue_command(Command::Pause);
    let paused = eng.tick();
    assert!(paused.paused);
    let frozen = eng.tick();
    assert_eq!(paused.time.tick, frozen.time.tick);

    eng.queue_command(Command::Resume);
    assert_eq!(eng.tick().time.tick, frozen.time.tick + 1);
}

#[test]
fn test_resolve_hit_waits_while_paused() {
    let attacker = unit_def("grunt", AttackProfile::Melee, 10, 1.2);
    let mut eng = engine(external(), &[attacker.clone(), dummy("dummy")]);
    let a = eng.spawn_test_unit(&attacker, Team::Ally, Position::new(0.0, 0.0));
    let e = eng.spawn_test_unit(&dummy("dummy"), Team::Enemy, Position::new(0.5, 0.0));
    eng.start_test_battle();
    eng.tick();
    assert!(eng.pending_intent(a).is_some());

    eng.queue_command(Command::Pause);
    eng.tick();
    eng.queue_command(Command::ResolveHit { unit: a });
    let paused = eng.tick();
    assert!(paused.paused);
    assert_eq!(eng.unit_health(e), Some(100));
    assert!(eng.pending_intent(a).is_some());

    eng.queue_command(Command::Resume);
    let resumed = eng.tick();
    assert!(!resumed.paused);
    assert_eq!(eng.unit_health(e), Some(90));
    assert!(eng.pending_intent(a).is_none());
}

#[test]
fn test_set_time_scale_clamped() {
    let mut eng = engine(instant(), &[dummy("dummy")]);
    eng.queue_command(Command::SetTimeScale { scale: 10.0 });
    eng.tick();
    assert_eq!(eng.time_scale(), 4.0);
    eng.queue_command(Command::SetTimeScale { scale: -1.0 });
    eng.tick();
    assert_eq!(eng.time_scale(), 0.0);
}

#[test]
fn test_sim_config_from_toml() {
    let cfg = SimConfig::from_toml_str(
        r#"
        seed = 7
        [combat]
        death_grace_secs = 1.0
        windup = { mode = "External" }
        retarget = { policy = "Sticky", switch_margin = 0.5 }
        "#,
    )
    .unwrap();
    assert_eq!(cfg.seed, 7);
    assert_eq!(cfg.combat.windup, WindupMode::External);
    assert_eq!(cfg.combat.death_grace_secs, 1.0);
    assert_eq!(cfg.time_scale, 1.0);
}

#[test]
fn test_shipped_data_loads_and_starts() {
    let catalog = UnitCatalog::from_toml_str(include_str!("../../../data/units.toml")).unwrap();
    let level =
        LevelDefinition::from_toml_str(include_str!("../../../data/levels/level1.toml")).unwrap();
    let config = SimConfig::from_toml_str(include_str!("../../../data/sim.toml")).unwrap();
    assert!(level.validate(&catalog).is_ok());
    assert_eq!(config.combat.starting_souls, 2);

    let mut eng = SimulationEngine::new(config, catalog);
    eng.queue_command(Command::StartLevel { level });
    let snap = eng.tick();
    assert_eq!(snap.phase, RoundPhase::Planning);
    assert_eq!(snap.rounds_total, 3);
    let enemies = snap.units.iter().filter(|u| u.team == Team::Enemy).count();
    assert_eq!(enemies, 2);
}

// ---- Formation ----

#[test]
fn test_formation_rows_and_locks() {
    let mut world = World::new();
    let mut registry = SpatialRegistry::new();
    let melee = UnitDefinition::new("m", Archetype::Melee, AttackProfile::Melee);
    let ranged = UnitDefinition::new("r", Archetype::Ranged, AttackProfile::ranged());
    for i in 0..10 {
        spawn_unit(&mut world, &mut registry, &melee, Team::Ally, 1, UnitId(i), Position::default(), false);
    }
    for i in 10..13 {
        spawn_unit(&mut world, &mut registry, &ranged, Team::Ally, 1, UnitId(i), Position::default(), false);
    }
    let pinned = Position::new(9.0, 9.0);
    spawn_unit(&mut world, &mut registry, &melee, Team::Ally, 1, UnitId(99), pinned, true);

    let layout = FormationLayout::default();
    assert_eq!(formation::arrange(&mut world, Team::Ally, &layout), 13);

    let mut query = world.query::<(&UnitId, &Position)>();
    let positions: Vec<(UnitId, Position)> = query.iter().map(|(_, (id, p))| (*id, *p)).collect();
    drop(query);

    let pinned_now = positions.iter().find(|(id, _)| *id == UnitId(99)).unwrap().1;
    assert_eq!(pinned_now, pinned);

    let mut rows: Vec<(i32, usize)> = Vec::new();
    for (id, pos) in &positions {
        if *id == UnitId(99) {
            continue;
        }
        let key = (pos.y() * 100.0).round() as i32;
        match rows.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => rows.push((key, 1)),
        }
    }
    assert!(rows.iter().all(|(_, n)| *n <= 8));
    assert_eq!(rows.len(), 3, "two melee rows and one ranged row");

    // Melee sits in front (toward +y for the ally side) of ranged.
    let melee_front = positions.iter().find(|(id, _)| *id == UnitId(0)).unwrap().1;
    let ranged_any = positions.iter().find(|(id, _)| *id == UnitId(10)).unwrap().1;
    assert!(melee_front.y() > ranged_any.y());
}

// ---- Chain invariants ----

proptest! {
    #[test]
    fn prop_chain_links_distinct_and_within_range(
        points in prop::collection::vec((-5.0f32..5.0, -5.0f32..5.0), 1..12),
        max_bounces in 0u32..6,
        chain_range in 0.5f32..4.0,
    ) {
        let mut world = World::new();
        let mut registry = SpatialRegistry::new();
        let def = UnitDefinition::new("e", Archetype::Melee, AttackProfile::Melee);
        for (i, (x, y)) in points.iter().enumerate() {
            spawn_unit(&mut world, &mut registry, &def, Team::Enemy, 1, UnitId(i as u32), Position::new(*x, *y), false);
        }
        let primary_pos = Position::new(points[0].0, points[0].1);
        let links = build_chain(&world, &registry, UnitId(0), primary_pos, Team::Ally, chain_range, max_bounces);

        prop_assert!(links.len() <= 1 + max_bounces as usize);
        prop_assert_eq!(links[0], UnitId(0));
        for (i, a) in links.iter().enumerate() {
            for b in &links[i + 1..] {
                prop_assert_ne!(a, b);
            }
        }
        for pair in links.windows(2) {
            let (ax, ay) = points[pair[0].0 as usize];
            let (bx, by) = points[pair[1].0 as usize];
            let d = Position::new(ax, ay).range_to(&Position::new(bx, by));
            prop_assert!(d <= chain_range + 1e-4);
        }
    }

    #[test]
    fn prop_health_stays_in_bounds(
        max_health in 1u32..500,
        hits in prop::collection::vec(0u32..300, 0..20),
    ) {
        let mut world = World::new();
        let mut registry = SpatialRegistry::new();
        let mut events = Vec::new();
        let mut score = ScoreState::default();
        let mut def = UnitDefinition::new("t", Archetype::Melee, AttackProfile::Melee);
        def.max_health = max_health;
        spawn_unit(&mut world, &mut registry, &def, Team::Enemy, 1, UnitId(1), Position::default(), false);
        let entity = registry.entity(UnitId(1)).unwrap();

        let mut total = 0u64;
        for hit in hits {
            let mut ctx = CombatCtx {
                world: &mut world,
                registry: &mut registry,
                events: &mut events,
                score: &mut score,
                now: 0.0,
            };
            if let Some(report) = apply_damage(&mut ctx, UnitId(1), hit) {
                total += u64::from(report.applied);
            }
            let health = *world.get::<&Health>(entity).unwrap();
            let alive = world.get::<&Lifecycle>(entity).unwrap().alive;
            prop_assert!(health.current <= health.max);
            prop_assert_eq!(alive, health.current > 0);
            prop_assert_eq!(alive, registry.is_live(UnitId(1)));
        }
        prop_assert!(total <= u64::from(max_health));
        prop_assert_eq!(score.damage_dealt, total);
    }
}
