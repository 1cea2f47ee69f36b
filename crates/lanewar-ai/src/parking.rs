//! Idle→obstacle parking policy for navigator-driven units.
//!
//! A unit that sits parked at its destination with nothing to do for
//! `threshold_secs` becomes a static obstacle so it stops blocking path
//! queries of its neighbours as a moving agent. The next movement decision
//! turns it back into an agent.

use lanewar_core::components::ParkingState;

/// What the navigator should do with the unit this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkingAction {
    None,
    BecomeObstacle,
    BecomeAgent,
}

/// Advance the parking state.
///
/// `parked_idle`: the navigator reports the unit at its destination and the AI has no target.
/// `wants_to_move`: the AI requested movement this tick.
pub fn update(
    state: &mut ParkingState,
    parked_idle: bool,
    wants_to_move: bool,
    now: f64,
    threshold_secs: f64,
) -> ParkingAction {
    if wants_to_move {
        state.idle_since = None;
        if state.obstacle {
            state.obstacle = false;
            return ParkingAction::BecomeAgent;
        }
        return ParkingAction::None;
    }

    if !parked_idle {
        state.idle_since = None;
        return ParkingAction::None;
    }

    let since = *state.idle_since.get_or_insert(now);
    if !state.obstacle && now - since >= threshold_secs {
        state.obstacle = true;
        return ParkingAction::BecomeObstacle;
    }
    ParkingAction::None
}
