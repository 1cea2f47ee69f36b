//! Entity spawn factories for units and projectiles.

use hecs::{Entity, EntityBuilder, World};

use lanewar_core::components::*;
use lanewar_core::definitions::{ResolvedStats, UnitDefinition};
use lanewar_core::enums::Team;
use lanewar_core::types::{Position, UnitId, Velocity};

use crate::registry::SpatialRegistry;

/// A player unit that persists across rounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub id: UnitId,
    pub definition_id: String,
    pub level: u32,
    /// Set for manually placed units, which keep their spot and stay locked.
    pub placement: Option<Position>,
}

/// Spawn a unit at full health with AI disabled and register it.
///
/// Placed units start locked so formation arrangement leaves them alone.
#[allow(clippy::too_many_arguments)]
pub fn spawn_unit(
    world: &mut World,
    registry: &mut SpatialRegistry,
    def: &UnitDefinition,
    team: Team,
    level: u32,
    id: UnitId,
    position: Position,
    placed: bool,
) -> Entity {
    let stats = ResolvedStats::resolve(def, level);

    let mut builder = EntityBuilder::new();
    builder
        .add(id)
        .add(team)
        .add(def.archetype)
        .add(position)
        .add(Velocity::default())
        .add(UnitStats {
            damage: stats.damage,
            move_speed: stats.move_speed,
            attack_range: stats.attack_range,
            attack_cooldown: stats.attack_cooldown,
        })
        .add(Health {
            current: stats.max_health,
            max: stats.max_health,
        })
        .add(Lifecycle {
            alive: true,
            locked: placed,
            died_at: None,
        })
        .add(UnitOrigin {
            definition_id: def.id.clone(),
            level,
            placed,
        })
        .add(AiController::default())
        .add(AttackStrategy {
            profile: def.attack.clone(),
            pending: None,
        });
    let entity = world.spawn(builder.build());
    registry.register(id, entity, team);
    entity
}

/// Spawn a projectile entity at `origin`.
pub fn spawn_projectile(world: &mut World, projectile: Projectile, origin: Position) -> Entity {
    world.spawn((projectile, origin))
}
