//! Shared combat plumbing: the mutable context handed to damage-dealing
//! code, and the running score.
//!
//! Stored on `SimulationEngine`, NOT as ECS entities.

use hecs::World;

use lanewar_core::events::PresentationEvent;

use crate::registry::SpatialRegistry;

/// Running score state tracked by the engine.
#[derive(Debug, Clone, Default)]
pub struct ScoreState {
    pub rounds_won: u32,
    pub enemies_killed: u32,
    pub allies_lost: u32,
    pub damage_dealt: u64,
}

/// Everything damage application needs, borrowed for the duration of one step.
pub struct CombatCtx<'a> {
    pub world: &'a mut World,
    pub registry: &'a mut SpatialRegistry,
    pub events: &'a mut Vec<PresentationEvent>,
    pub score: &'a mut ScoreState,
    /// Simulation time of the current tick.
    pub now: f64,
}
