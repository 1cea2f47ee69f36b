//! Unit AI system: target selection, FSM evaluation, movement and attack starts.
//!
//! Calls the unit FSM from lanewar-ai for every unit against a snapshot of
//! the world taken at the start of the tick, then applies the buffered
//! decisions. All units therefore decide on the same positions, whatever
//! order they are processed in.

use glam::Vec2;
use hecs::{Entity, World};
use rand_chacha::ChaCha8Rng;

use lanewar_core::components::{AiController, AttackIntent, AttackStrategy, Lifecycle, UnitStats};
use lanewar_core::config::CombatConfig;
use lanewar_core::enums::{AiState, Team};
use lanewar_core::events::PresentationEvent;
use lanewar_core::types::{Position, UnitId, Velocity};

use lanewar_ai::fsm::{evaluate, AiDecision, Movement, TargetInfo, UnitContext};
use lanewar_ai::parking::{self, ParkingAction};
use lanewar_ai::targeting::{choose_target, roll_approach_offset, Candidate};

use crate::navigation::Navigator;
use crate::obstacles::{has_line_of_sight, ObstacleMap};
use crate::registry::SpatialRegistry;
use crate::systems::attack::begin_attack;

/// Everything the AI system touches this tick.
pub struct AiCtx<'a> {
    pub world: &'a mut World,
    pub registry: &'a SpatialRegistry,
    pub obstacles: &'a ObstacleMap,
    pub navigator: Option<&'a mut (dyn Navigator + 'static)>,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a CombatConfig,
    pub events: &'a mut Vec<PresentationEvent>,
    pub now: f64,
    pub dt: f64,
}

/// An attack started this tick, for the engine to schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedAttack {
    pub attacker: UnitId,
    pub intent: AttackIntent,
}

#[derive(Debug, Clone, Copy)]
struct UnitSnapshot {
    entity: Entity,
    id: UnitId,
    team: Team,
    position: Position,
    stats: UnitStats,
    alive: bool,
    ai: AiController,
    pending: Option<AttackIntent>,
}

/// Run the unit AI system. Returns the attacks started this tick.
pub fn run(ctx: &mut AiCtx<'_>) -> Vec<StartedAttack> {
    let mut units: Vec<UnitSnapshot> = ctx
        .world
        .query::<(
            &UnitId,
            &Team,
            &Position,
            &UnitStats,
            &Lifecycle,
            &AiController,
            &AttackStrategy,
        )>()
        .iter()
        .map(|(entity, (id, team, pos, stats, lifecycle, ai, strategy))| UnitSnapshot {
            entity,
            id: *id,
            team: *team,
            position: *pos,
            stats: *stats,
            alive: lifecycle.alive,
            ai: *ai,
            pending: strategy.pending,
        })
        .collect();
    units.sort_by_key(|u| u.id);

    // Decide against the unmodified world.
    let mut updates: Vec<(UnitSnapshot, AiController, AiDecision)> = Vec::with_capacity(units.len());
    for unit in units {
        let mut ai = unit.ai;
        let active = unit.alive && ai.enabled;
        let target = if active {
            select_target(ctx.world, ctx.registry, ctx.config, &unit)
        } else {
            None
        };

        let target_id = target.map(|t| t.id);
        if target_id != ai.target {
            ai.approach_offset = match target_id {
                Some(_) => roll_approach_offset(ctx.rng, ctx.config.approach_offset_radius),
                None => Vec2::ZERO,
            };
            ai.target = target_id;
        }
        let line_of_sight = target.map_or(true, |t| {
            has_line_of_sight(ctx.obstacles, &unit.position, &t.position)
        });

        let decision = evaluate(&UnitContext {
            alive: unit.alive,
            enabled: ai.enabled,
            position: unit.position,
            stats: unit.stats,
            now: ctx.now,
            dt: ctx.dt,
            last_attack_time: ai.last_attack_time,
            target,
            approach_offset: ai.approach_offset,
            line_of_sight,
            winding_up: winding_up(unit.pending, ctx.now, ctx.config.max_windup_secs),
        });
        updates.push((unit, ai, decision));
    }

    let mut started = Vec::new();
    for (unit, mut ai, decision) in updates {
        ai.state = decision.state;
        let velocity = if unit.alive {
            apply_movement(ctx, &unit, &mut ai, decision)
        } else {
            Velocity::default()
        };

        let moving = velocity.is_moving();
        if moving != ai.moving {
            ai.moving = moving;
            ctx.events.push(PresentationEvent::MovingChanged {
                unit: unit.id,
                moving,
            });
        }

        if decision.fire {
            if let Some(target) = ai.target {
                ai.last_attack_time = Some(ctx.now);
                if let Some(intent) =
                    begin_attack(ctx.world, unit.entity, unit.id, target, ctx.now, ctx.events)
                {
                    started.push(StartedAttack {
                        attacker: unit.id,
                        intent,
                    });
                }
            }
        }

        if let Ok(mut controller) = ctx.world.get::<&mut AiController>(unit.entity) {
            *controller = ai;
        }
    }
    started
}

/// Whether a pending intent still blocks a new attack. An intent past the
/// wind-up cap can no longer resolve, so it stops blocking.
fn winding_up(pending: Option<AttackIntent>, now: f64, max_windup_secs: Option<f64>) -> bool {
    pending.is_some_and(|intent| max_windup_secs.map_or(true, |max| now - intent.issued_at <= max))
}

/// Pick this tick's target under the configured retarget policy.
fn select_target(
    world: &World,
    registry: &SpatialRegistry,
    config: &CombatConfig,
    unit: &UnitSnapshot,
) -> Option<TargetInfo> {
    let position_of = |entity: Entity| world.get::<&Position>(entity).ok().map(|p| *p);

    let nearest = registry
        .nearest_enemy(world, &unit.position, unit.team)
        .and_then(|hit| {
            let pos = position_of(hit.entity)?;
            Some((Candidate { id: hit.id, distance: hit.distance }, pos))
        });
    let current = unit.ai.target.and_then(|id| {
        let entity = registry.live_entity(id)?;
        let team = world.get::<&Team>(entity).ok().map(|t| *t)?;
        if team == unit.team {
            return None;
        }
        let pos = position_of(entity)?;
        Some((
            Candidate {
                id,
                distance: unit.position.range_to(&pos),
            },
            pos,
        ))
    });

    let chosen = choose_target(config.retarget, current.map(|c| c.0), nearest.map(|c| c.0))?;
    [current, nearest]
        .into_iter()
        .flatten()
        .find(|(candidate, _)| candidate.id == chosen)
        .map(|(candidate, position)| TargetInfo {
            id: candidate.id,
            position,
        })
}

/// Move the unit per its decision and return its new velocity.
fn apply_movement(
    ctx: &mut AiCtx<'_>,
    unit: &UnitSnapshot,
    ai: &mut AiController,
    decision: AiDecision,
) -> Velocity {
    let wants_to_move = matches!(decision.movement, Movement::MoveTo { .. });
    let dt = ctx.dt as f32;

    let (position, velocity) = match ctx.navigator.as_deref_mut() {
        Some(nav) => {
            let parked_idle = decision.state == AiState::Idle && nav.at_destination(unit.id);
            match parking::update(
                &mut ai.parking,
                parked_idle,
                wants_to_move,
                ctx.now,
                ctx.config.obstacle_idle_secs,
            ) {
                ParkingAction::BecomeObstacle => nav.set_obstacle_mode(unit.id, true),
                ParkingAction::BecomeAgent => nav.set_obstacle_mode(unit.id, false),
                ParkingAction::None => {}
            }
            match decision.movement {
                Movement::MoveTo { destination, .. } => {
                    nav.set_destination(unit.id, destination);
                    let velocity = nav.velocity(unit.id);
                    (unit.position.offset(velocity.0 * dt), velocity)
                }
                Movement::Hold => {
                    if ai.moving {
                        nav.stop(unit.id);
                    }
                    (unit.position, Velocity::default())
                }
            }
        }
        None => match decision.movement {
            Movement::MoveTo { next_position, .. } => {
                let velocity = if dt > 0.0 {
                    Velocity((next_position.0 - unit.position.0) / dt)
                } else {
                    Velocity::default()
                };
                (next_position, velocity)
            }
            Movement::Hold => (unit.position, Velocity::default()),
        },
    };

    if let Ok(mut pos) = ctx.world.get::<&mut Position>(unit.entity) {
        *pos = position;
    }
    if let Ok(mut vel) = ctx.world.get::<&mut Velocity>(unit.entity) {
        *vel = velocity;
    }
    velocity
}
