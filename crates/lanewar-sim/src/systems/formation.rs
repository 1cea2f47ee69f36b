//! Formation arrangement for the planning phase.
//!
//! Melee units form the front block, ranged units the block behind it.
//! Each block fills rows of at most `max_per_row` units, centred on the
//! lane axis, with extra rows stacking away from the enemy. Locked units
//! (manual placements, or everyone once a battle has started) are skipped.

use glam::Vec2;
use hecs::{Entity, World};

use lanewar_core::components::Lifecycle;
use lanewar_core::config::FormationLayout;
use lanewar_core::enums::{Archetype, Team};
use lanewar_core::types::{Position, UnitId};

/// Arrange all unlocked living units of `team`. Returns how many were moved.
pub fn arrange(world: &mut World, team: Team, layout: &FormationLayout) -> usize {
    let mut units: Vec<(UnitId, Entity, Archetype)> = world
        .query::<(&UnitId, &Team, &Archetype, &Lifecycle)>()
        .iter()
        .filter(|(_, (_, t, _, lifecycle))| **t == team && lifecycle.alive && !lifecycle.locked)
        .map(|(entity, (id, _, archetype, _))| (*id, entity, *archetype))
        .collect();
    units.sort_by_key(|u| u.0);

    let (melee, ranged): (Vec<_>, Vec<_>) = units
        .into_iter()
        .partition(|(_, _, archetype)| *archetype == Archetype::Melee);

    let per_row = layout.max_per_row.max(1);
    let origin = Vec2::from(layout.origin);
    let front_line = origin + Vec2::new(0.0, layout.forward * layout.front_offset);
    // Push the ranged block back if the melee block needs more than one row.
    let melee_rows = melee.len().div_ceil(per_row).max(1);
    let back_line =
        origin - Vec2::new(0.0, layout.forward * (melee_rows - 1) as f32 * layout.row_spacing);

    for (block, line) in [(&melee, front_line), (&ranged, back_line)] {
        for (index, (_, entity, _)) in block.iter().enumerate() {
            let slot = formation_slot(index, block.len(), line, layout);
            if let Ok(mut pos) = world.get::<&mut Position>(*entity) {
                *pos = slot;
            }
        }
    }
    melee.len() + ranged.len()
}

/// Position of the `index`-th of `count` units in a block anchored on `line`.
pub fn formation_slot(index: usize, count: usize, line: Vec2, layout: &FormationLayout) -> Position {
    let per_row = layout.max_per_row.max(1);
    let row = index / per_row;
    let col = index % per_row;
    let in_row = count.saturating_sub(row * per_row).min(per_row);
    let x = (col as f32 - (in_row as f32 - 1.0) * 0.5) * layout.cell_spacing;
    let y = -layout.forward * row as f32 * layout.row_spacing;
    Position(line + Vec2::new(x, y))
}
