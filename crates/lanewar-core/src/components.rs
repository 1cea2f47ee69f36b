//! ECS components for hecs entities.
//!
//! Components are plain data structs with no methods.
//! Game logic lives in systems, not components.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::definitions::AttackProfile;
use crate::enums::*;
use crate::types::UnitId;

/// Combat stats resolved at spawn. Never change afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnitStats {
    pub damage: u32,
    pub move_speed: f32,
    pub attack_range: f32,
    /// Minimum seconds between two attack starts.
    pub attack_cooldown: f64,
}

/// Hit points. `current` stays within `0..=max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

/// Lifecycle flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Lifecycle {
    /// False from the instant health reaches zero.
    pub alive: bool,
    /// Exempt from automatic formation arrangement.
    pub locked: bool,
    /// Simulation time of death, if dead.
    pub died_at: Option<f64>,
}

/// Where a unit came from; used for roster respawn and soul drops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOrigin {
    pub definition_id: String,
    pub level: u32,
    /// Manually placed units keep their placement position across rounds.
    pub placed: bool,
}

/// Navigator parking bookkeeping for the idle→obstacle policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParkingState {
    /// When the unit was first seen parked and idle.
    pub idle_since: Option<f64>,
    /// Whether the unit currently acts as a static obstacle.
    pub obstacle: bool,
}

/// Per-unit AI controller state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AiController {
    pub state: AiState,
    /// Toggled en masse by the round controller.
    pub enabled: bool,
    /// Target chosen on the last evaluated tick.
    pub target: Option<UnitId>,
    /// Lateral offset applied to the approach point, re-rolled only when the target changes.
    pub approach_offset: Vec2,
    /// Simulation time of the last attack start.
    pub last_attack_time: Option<f64>,
    /// Last value reported to presentation via `MovingChanged`.
    pub moving: bool,
    pub parking: ParkingState,
}

/// An in-flight attack commitment awaiting its deferred hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackIntent {
    pub target: UnitId,
    pub issued_at: f64,
}

/// The unit's attack strategy and its pending intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackStrategy {
    pub profile: AttackProfile,
    pub pending: Option<AttackIntent>,
}

/// Splash parameters carried by a meteor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Splash {
    pub radius: f32,
    /// Fraction of the primary damage dealt to each splashed unit.
    pub fraction: f64,
}

/// A projectile homing on a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub attacker: UnitId,
    pub attacker_team: Team,
    pub target: UnitId,
    pub damage: u32,
    pub speed: f32,
    pub impact_radius: f32,
    pub splash: Option<Splash>,
    /// Simulation time of launch. Flight starts on the following tick.
    pub launched_at: f64,
}

/// Dead unit waiting for its death presentation to finish.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Corpse {
    pub despawn_at: f64,
}
