//! Snapshot system: queries the ECS world and builds a complete GameStateSnapshot.
//!
//! This system is read-only and never modifies the world.

use hecs::World;

use lanewar_core::components::*;
use lanewar_core::enums::{Archetype, Team};
use lanewar_core::events::PresentationEvent;
use lanewar_core::state::*;
use lanewar_core::types::{Position, SimTime, UnitId};

use crate::combat::ScoreState;
use crate::registry::SpatialRegistry;
use crate::round::RoundController;

/// Engine-side state the snapshot reports alongside the world.
pub struct SnapshotInputs<'a> {
    pub time: &'a SimTime,
    pub round: &'a RoundController,
    pub paused: bool,
    pub souls: u32,
    pub score: &'a ScoreState,
}

/// Build a complete GameStateSnapshot from the current world state.
pub fn build_snapshot(
    world: &World,
    registry: &SpatialRegistry,
    inputs: SnapshotInputs<'_>,
    events: Vec<PresentationEvent>,
) -> GameStateSnapshot {
    let round = inputs.round;
    GameStateSnapshot {
        time: *inputs.time,
        phase: round.phase(),
        paused: inputs.paused,
        round_index: round.round_index(),
        rounds_total: round.rounds_total(),
        picks_done: round.picks_done(),
        picks_required: round.picks_required(),
        souls: inputs.souls,
        units: build_units(world, registry),
        projectiles: build_projectiles(world),
        events,
        outcome: round.outcome(),
        score: ScoreView {
            rounds_won: inputs.score.rounds_won,
            enemies_killed: inputs.score.enemies_killed,
            allies_lost: inputs.score.allies_lost,
            damage_dealt: inputs.score.damage_dealt,
        },
    }
}

/// Build UnitView list, ordered by unit id.
fn build_units(world: &World, registry: &SpatialRegistry) -> Vec<UnitView> {
    let mut query = world.query::<(
        &UnitId,
        &Team,
        &Archetype,
        &Position,
        &Health,
        &Lifecycle,
        &UnitOrigin,
        &AiController,
        &AttackStrategy,
    )>();
    let mut units: Vec<UnitView> = query
        .iter()
        .map(
            |(_, (id, team, archetype, pos, health, lifecycle, origin, ai, strategy))| {
                let target_x = ai
                    .target
                    .and_then(|t| registry.entity(t))
                    .and_then(|e| world.get::<&Position>(e).ok().map(|p| p.x()));
                UnitView {
                    id: *id,
                    definition_id: origin.definition_id.clone(),
                    team: *team,
                    archetype: *archetype,
                    attack: strategy.profile.kind(),
                    position: *pos,
                    health: health.current,
                    max_health: health.max,
                    alive: lifecycle.alive,
                    locked: lifecycle.locked,
                    ai_state: ai.state,
                    target: ai.target,
                    moving: ai.moving,
                    facing_left: target_x.is_some_and(|x| x < pos.x()),
                }
            },
        )
        .collect();
    units.sort_by_key(|u| u.id);
    units
}

/// Build ProjectileView list, ordered by target then position for stable output.
fn build_projectiles(world: &World) -> Vec<ProjectileView> {
    let mut projectiles: Vec<ProjectileView> = world
        .query::<(&Projectile, &Position)>()
        .iter()
        .map(|(_, (projectile, pos))| ProjectileView {
            kind: projectile.kind,
            position: *pos,
            target: projectile.target,
        })
        .collect();
    projectiles.sort_by(|a, b| {
        a.target
            .cmp(&b.target)
            .then(a.position.x().total_cmp(&b.position.x()))
            .then(a.position.y().total_cmp(&b.position.y()))
    });
    projectiles
}
