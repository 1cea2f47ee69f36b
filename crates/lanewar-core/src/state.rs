//! Game state snapshot: the complete visible state handed to the host each tick.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::PresentationEvent;
use crate::types::{Position, SimTime, UnitId};

/// Complete game state produced after each tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub time: SimTime,
    pub phase: RoundPhase,
    pub paused: bool,
    pub round_index: usize,
    pub rounds_total: usize,
    pub picks_done: u32,
    pub picks_required: u32,
    pub souls: u32,
    pub units: Vec<UnitView>,
    pub projectiles: Vec<ProjectileView>,
    pub events: Vec<PresentationEvent>,
    pub outcome: Option<MatchOutcome>,
    pub score: ScoreView,
}

/// One unit as presentation sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub definition_id: String,
    pub team: Team,
    pub archetype: Archetype,
    pub attack: AttackKind,
    pub position: Position,
    pub health: u32,
    pub max_health: u32,
    pub alive: bool,
    pub locked: bool,
    pub ai_state: AiState,
    pub target: Option<UnitId>,
    pub moving: bool,
    /// Derived: the current target lies to the left.
    pub facing_left: bool,
}

/// A projectile in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileView {
    pub kind: ProjectileKind,
    pub position: Position,
    pub target: UnitId,
}

/// Running tallies for the match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreView {
    pub rounds_won: u32,
    pub enemies_killed: u32,
    pub allies_lost: u32,
    pub damage_dealt: u64,
}
