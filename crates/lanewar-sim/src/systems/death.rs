//! Death processing and corpse cleanup.
//!
//! A unit is marked dead and leaves the live registry inside
//! `apply_damage`. This system follows up on the same tick: it suppresses
//! the unit's AI, drops its pending intent, rolls soul drops and starts the
//! corpse timer. Corpses are despawned once the timer runs out.

use hecs::{Entity, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use lanewar_core::components::*;
use lanewar_core::constants::SOULS_PER_DROP;
use lanewar_core::definitions::UnitCatalog;
use lanewar_core::enums::{AiState, Team};
use lanewar_core::events::PresentationEvent;
use lanewar_core::types::{Position, UnitId, Velocity};

use crate::combat::ScoreState;
use crate::economy::SoulBank;
use crate::navigation::Navigator;
use crate::registry::SpatialRegistry;

/// Mutable engine state touched by death processing.
pub struct DeathCtx<'a> {
    pub world: &'a mut World,
    pub catalog: &'a UnitCatalog,
    pub souls: &'a mut (dyn SoulBank + 'static),
    pub rng: &'a mut ChaCha8Rng,
    pub navigator: Option<&'a mut (dyn Navigator + 'static)>,
    pub events: &'a mut Vec<PresentationEvent>,
    pub score: &'a mut ScoreState,
    pub grace_secs: f64,
}

/// Handle units that died since the last call.
pub fn run(ctx: &mut DeathCtx<'_>) {
    let mut newly_dead: Vec<(Entity, UnitId, Team, Position, String, f64)> = ctx
        .world
        .query::<(&UnitId, &Team, &Lifecycle, &Position, &UnitOrigin, Option<&Corpse>)>()
        .iter()
        .filter(|(_, (_, _, lifecycle, _, _, corpse))| !lifecycle.alive && corpse.is_none())
        .map(|(entity, (id, team, lifecycle, pos, origin, _))| {
            (
                entity,
                *id,
                *team,
                *pos,
                origin.definition_id.clone(),
                lifecycle.died_at.unwrap_or_default(),
            )
        })
        .collect();
    // Deterministic order for the soul-drop rolls.
    newly_dead.sort_by_key(|d| d.1);

    for (entity, id, team, position, definition_id, died_at) in newly_dead {
        suppress(ctx.world, entity);
        if let Some(nav) = ctx.navigator.as_deref_mut() {
            nav.stop(id);
        }
        let _ = ctx.world.insert_one(
            entity,
            Corpse {
                despawn_at: died_at + ctx.grace_secs,
            },
        );

        ctx.events.push(PresentationEvent::UnitDied { unit: id, team });
        match team {
            Team::Ally => ctx.score.allies_lost += 1,
            Team::Enemy => {
                ctx.score.enemies_killed += 1;
                roll_soul_drop(ctx, id, position, &definition_id);
            }
        }
        tracing::info!(unit = %id, ?team, "unit died");
    }
}

fn suppress(world: &mut World, entity: Entity) {
    if let Ok(mut ai) = world.get::<&mut AiController>(entity) {
        ai.state = AiState::Suppressed;
        ai.enabled = false;
        ai.target = None;
    }
    if let Ok(mut strategy) = world.get::<&mut AttackStrategy>(entity) {
        strategy.pending = None;
    }
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        *vel = Velocity::default();
    }
}

fn roll_soul_drop(ctx: &mut DeathCtx<'_>, id: UnitId, position: Position, definition_id: &str) {
    let chance = ctx
        .catalog
        .get(definition_id)
        .map_or(0.0, |def| def.soul_drop_chance);
    if chance <= 0.0 || !ctx.rng.gen_bool(chance.min(1.0)) {
        return;
    }
    ctx.souls.earn(SOULS_PER_DROP);
    ctx.events.push(PresentationEvent::SoulDropped {
        unit: id,
        position,
        amount: SOULS_PER_DROP,
    });
    ctx.events.push(PresentationEvent::SoulsChanged {
        balance: ctx.souls.balance(),
    });
}

/// Despawn corpses whose grace period has elapsed.
/// Uses a pre-allocated buffer to avoid per-tick allocation.
pub fn despawn_corpses(
    world: &mut World,
    registry: &mut SpatialRegistry,
    now: f64,
    despawn_buffer: &mut Vec<Entity>,
) {
    despawn_buffer.clear();

    for (entity, (id, corpse)) in world.query_mut::<(&UnitId, &Corpse)>() {
        if now >= corpse.despawn_at {
            registry.remove(*id);
            despawn_buffer.push(entity);
        }
    }

    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}
