//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Which side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// The player's team (the defending side for tie resolution).
    Ally,
    Enemy,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Ally => Team::Enemy,
            Team::Enemy => Team::Ally,
        }
    }
}

/// Unit archetype. Drives formation line placement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    #[default]
    Melee,
    Ranged,
}

/// Per-unit AI controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiState {
    /// No valid target.
    Idle,
    /// Target set, out of range or line of sight blocked.
    Approaching,
    /// In range with clear line of sight; attacking on cooldown.
    Engaging,
    /// Disabled by the round controller, or the unit is dead.
    #[default]
    Suppressed,
}

/// Attack strategy tag, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackKind {
    Melee,
    Ranged,
    Chain,
    AreaSplash,
}

/// Projectile behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Single-target seeking arrow/bolt.
    Seeking,
    /// Homing meteor that splashes on impact.
    Meteor,
}

/// Round controller phase (top-level state).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No level started yet.
    #[default]
    NotStarted,
    /// Enemy wave spawned, player may add units, AI globally disabled.
    Planning,
    /// AI globally enabled, win/loss polled every tick.
    Battle,
    /// Transient: one team has been eliminated this tick.
    RoundResolved,
    /// Terminal: every round won.
    MatchWon,
    /// Terminal: the player's team was eliminated.
    MatchLost,
    /// Level data was missing or invalid; progression stopped.
    Halted,
}

impl RoundPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RoundPhase::MatchWon | RoundPhase::MatchLost | RoundPhase::Halted
        )
    }
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Won,
    Lost,
}
