//! Commands sent from the host to the simulation.
//!
//! Commands are queued and processed at the next tick boundary, so every
//! external input (including presentation callbacks) lands on the same
//! single-threaded tick stream.

use serde::{Deserialize, Serialize};

use crate::definitions::LevelDefinition;
use crate::types::{Position, UnitId};

/// All host inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    // --- Level flow ---
    /// Start a level at round 0.
    StartLevel { level: LevelDefinition },
    /// Player picked a unit from the selection UI (counts toward the quota).
    PickUnit { definition_id: String },
    /// Player dropped a unit at a chosen spot (locked, outside the quota).
    PlaceUnit {
        definition_id: String,
        position: Position,
    },
    /// Start the battle now, without waiting for the quota.
    CommitBattle,

    // --- Presentation callbacks ---
    /// The attack animation of `unit` reached its hit frame.
    ResolveHit { unit: UnitId },

    // --- Simulation control ---
    /// Set time scale (1.0 = normal, 2.0 = double, 0.0 = paused).
    SetTimeScale { scale: f64 },
    Pause,
    Resume,
}
