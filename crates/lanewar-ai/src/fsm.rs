//! Unit AI finite state machine.
//!
//! Pure functions that decide, for one unit and one tick, whether to hold,
//! move, or start an attack. No ECS dependency; it operates on plain data.

use glam::Vec2;

use lanewar_core::components::UnitStats;
use lanewar_core::enums::AiState;
use lanewar_core::types::{Position, UnitId};

/// The target picked for this tick, with its live position.
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub id: UnitId,
    pub position: Position,
}

/// Input to the unit FSM for a single entity.
#[derive(Debug, Clone, Copy)]
pub struct UnitContext {
    pub alive: bool,
    pub enabled: bool,
    pub position: Position,
    pub stats: UnitStats,
    pub now: f64,
    pub dt: f64,
    pub last_attack_time: Option<f64>,
    pub target: Option<TargetInfo>,
    /// Lateral offset around the target, stable for as long as the target is.
    pub approach_offset: Vec2,
    /// Result of the line-of-sight test toward the target.
    pub line_of_sight: bool,
    /// An earlier attack is still waiting for its hit.
    pub winding_up: bool,
}

/// Movement requested for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Movement {
    /// Stop and stay put.
    Hold,
    /// Head for `destination`; `next_position` is the kinematic step for this tick.
    MoveTo {
        destination: Position,
        next_position: Position,
    },
}

/// Output from the unit FSM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiDecision {
    pub state: AiState,
    pub movement: Movement,
    /// Start an attack on the target this tick (cooldown elapsed, no wind-up in progress).
    pub fire: bool,
}

impl AiDecision {
    fn hold(state: AiState) -> Self {
        Self {
            state,
            movement: Movement::Hold,
            fire: false,
        }
    }
}

/// Evaluate the FSM for one unit.
pub fn evaluate(ctx: &UnitContext) -> AiDecision {
    if !ctx.alive || !ctx.enabled {
        return AiDecision::hold(AiState::Suppressed);
    }

    let Some(target) = ctx.target else {
        return AiDecision::hold(AiState::Idle);
    };

    let distance = ctx.position.range_to(&target.position);
    if distance > ctx.stats.attack_range || !ctx.line_of_sight {
        let offset = clamp_offset(ctx.approach_offset, ctx.stats.attack_range);
        let destination = target.position.offset(offset);
        let max_step = ctx.stats.move_speed * ctx.dt as f32;
        return AiDecision {
            state: AiState::Approaching,
            movement: Movement::MoveTo {
                destination,
                next_position: ctx.position.step_toward(&destination, max_step),
            },
            fire: false,
        };
    }

    AiDecision {
        state: AiState::Engaging,
        movement: Movement::Hold,
        fire: !ctx.winding_up
            && cooldown_elapsed(ctx.last_attack_time, ctx.now, ctx.stats.attack_cooldown),
    }
}

/// True if no attack has started yet, or `cooldown` seconds have passed since the last one.
pub fn cooldown_elapsed(last_attack_time: Option<f64>, now: f64, cooldown: f64) -> bool {
    match last_attack_time {
        Some(last) => now - last >= cooldown,
        None => true,
    }
}

/// Keep the approach point inside attack range so a unit parked on it can always engage.
fn clamp_offset(offset: Vec2, attack_range: f32) -> Vec2 {
    offset.clamp_length_max(attack_range * 0.5)
}
