//! Spatial registry: the live set of combat units and nearest-unit queries.
//!
//! The registry indexes units, it does not own them. A unit leaves the live
//! index in the same call that drops its health to zero, so queries never
//! return a dead unit even while its corpse is still in the world.
//!
//! Queries are linear scans in registration order. On exact distance ties
//! the earliest-registered unit wins.

use std::collections::HashMap;

use hecs::{Entity, World};

use lanewar_core::components::Lifecycle;
use lanewar_core::enums::Team;
use lanewar_core::types::{Position, UnitId};

#[derive(Debug, Clone, Copy)]
struct LiveEntry {
    id: UnitId,
    entity: Entity,
    team: Team,
}

/// A unit returned by a registry query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryHit {
    pub id: UnitId,
    pub entity: Entity,
    pub team: Team,
    pub distance: f32,
}

#[derive(Debug, Default)]
pub struct SpatialRegistry {
    /// Live units, in registration order.
    live: Vec<LiveEntry>,
    /// Every unit still present in the world, live or corpse.
    entities: HashMap<UnitId, Entity>,
}

impl SpatialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a freshly spawned unit. Registering an already live id is a no-op.
    pub fn register(&mut self, id: UnitId, entity: Entity, team: Team) {
        self.entities.insert(id, entity);
        if !self.is_live(id) {
            self.live.push(LiveEntry { id, entity, team });
        }
    }

    /// Drop a unit from the live index (death). Returns whether it was live.
    pub fn deregister(&mut self, id: UnitId) -> bool {
        match self.live.iter().position(|e| e.id == id) {
            Some(index) => {
                self.live.remove(index);
                true
            }
            None => false,
        }
    }

    /// Forget a unit entirely (despawn).
    pub fn remove(&mut self, id: UnitId) {
        self.deregister(id);
        self.entities.remove(&id);
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.entities.clear();
    }

    pub fn is_live(&self, id: UnitId) -> bool {
        self.live.iter().any(|e| e.id == id)
    }

    /// Entity for any unit still in the world, live or not.
    pub fn entity(&self, id: UnitId) -> Option<Entity> {
        self.entities.get(&id).copied()
    }

    /// Entity for a live unit only.
    pub fn live_entity(&self, id: UnitId) -> Option<Entity> {
        self.live.iter().find(|e| e.id == id).map(|e| e.entity)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Nearest live unit satisfying `predicate(id, team)`.
    pub fn nearest<F>(&self, world: &World, origin: &Position, predicate: F) -> Option<RegistryHit>
    where
        F: Fn(UnitId, Team) -> bool,
    {
        let mut best: Option<RegistryHit> = None;
        for hit in self.scan(world, origin, predicate) {
            // Strict comparison keeps the earliest-registered unit on ties.
            if best.map_or(true, |b| hit.distance < b.distance) {
                best = Some(hit);
            }
        }
        best
    }

    /// Nearest live unit that is not on `team`.
    pub fn nearest_enemy(&self, world: &World, origin: &Position, team: Team) -> Option<RegistryHit> {
        self.nearest(world, origin, |_, other| other != team)
    }

    /// Every live unit within `radius` of `origin` satisfying `predicate`,
    /// in registration order. The result is a snapshot: callers may kill
    /// units while iterating it.
    pub fn within_radius<F>(
        &self,
        world: &World,
        origin: &Position,
        radius: f32,
        predicate: F,
    ) -> Vec<RegistryHit>
    where
        F: Fn(UnitId, Team) -> bool,
    {
        self.scan(world, origin, predicate)
            .filter(|hit| hit.distance <= radius)
            .collect()
    }

    /// Whether `team` has at least one living unit.
    pub fn any_alive(&self, world: &World, team: Team) -> bool {
        self.count_alive(world, team) > 0
    }

    pub fn count_alive(&self, world: &World, team: Team) -> usize {
        self.live
            .iter()
            .filter(|e| e.team == team && is_alive(world, e.entity))
            .count()
    }

    fn scan<'a, F>(
        &'a self,
        world: &'a World,
        origin: &'a Position,
        predicate: F,
    ) -> impl Iterator<Item = RegistryHit> + 'a
    where
        F: Fn(UnitId, Team) -> bool + 'a,
    {
        self.live.iter().filter_map(move |entry| {
            if !predicate(entry.id, entry.team) || !is_alive(world, entry.entity) {
                return None;
            }
            let pos = world.get::<&Position>(entry.entity).ok()?;
            Some(RegistryHit {
                id: entry.id,
                entity: entry.entity,
                team: entry.team,
                distance: origin.range_to(&pos),
            })
        })
    }
}

fn is_alive(world: &World, entity: Entity) -> bool {
    world
        .get::<&Lifecycle>(entity)
        .map(|l| l.alive)
        .unwrap_or(false)
}
