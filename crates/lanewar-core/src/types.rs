//! Fundamental geometric and simulation types.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable handle for a combat unit.
///
/// Assigned monotonically by the engine. Roster units keep their id across
/// round resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// 2D position in world units.
/// x runs along the lane front, y runs from the player side toward the enemy side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// 2D velocity (world units per second).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }

    /// Euclidean distance to another position.
    pub fn range_to(&self, other: &Position) -> f32 {
        self.0.distance(other.0)
    }

    /// Squared distance, for comparisons that do not need the root.
    pub fn range_sq_to(&self, other: &Position) -> f32 {
        self.0.distance_squared(other.0)
    }

    /// Move toward `target` by at most `max_step`. Never overshoots.
    pub fn step_toward(&self, target: &Position, max_step: f32) -> Position {
        let delta = target.0 - self.0;
        let dist = delta.length();
        if dist <= max_step || dist <= f32::EPSILON {
            *target
        } else {
            Position(self.0 + delta / dist * max_step)
        }
    }

    pub fn offset(&self, by: Vec2) -> Position {
        Position(self.0 + by)
    }
}

impl Velocity {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    /// Speed magnitude.
    pub fn speed(&self) -> f32 {
        self.0.length()
    }

    pub fn is_moving(&self) -> bool {
        self.0.length_squared() > f32::EPSILON
    }
}

impl SimTime {
    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_secs += dt;
    }
}
