//! Events emitted by the simulation for the presentation layer.
//!
//! All events are fire-and-forget: the core never consumes a response.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{Position, UnitId};

/// Presentation feedback drained into every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PresentationEvent {
    /// A level was accepted and its first round is about to start.
    LevelStarted { rounds: usize },
    /// A round entered Planning.
    RoundStarted { round: usize, picks_required: u32 },
    /// Combat started for the round.
    BattleStarted { round: usize },
    /// Every enemy of the round died.
    RoundWon { round: usize },
    MatchWon,
    MatchLost,
    /// Level data was missing or invalid.
    LevelHalted { reason: String },
    /// A unit entered the battlefield.
    UnitSpawned { unit: UnitId, team: Team },
    /// A roster unit was restored for a new round.
    UnitRevived { unit: UnitId },
    /// Begin the attack animation (windup).
    AttackStarted { unit: UnitId, target: UnitId },
    /// Walk animation toggle.
    MovingChanged { unit: UnitId, moving: bool },
    ProjectileLaunched {
        attacker: UnitId,
        target: UnitId,
        kind: ProjectileKind,
    },
    ProjectileImpact {
        attacker: UnitId,
        target: UnitId,
        kind: ProjectileKind,
        position: Position,
    },
    /// Chain lightning links, in hop order.
    ChainLightning { attacker: UnitId, links: Vec<UnitId> },
    UnitDamaged {
        unit: UnitId,
        amount: u32,
        remaining: u32,
    },
    UnitDied { unit: UnitId, team: Team },
    SoulDropped {
        unit: UnitId,
        position: Position,
        amount: u32,
    },
    SoulsChanged { balance: u32 },
    /// A command could not be applied.
    CommandRejected { reason: String },
}
