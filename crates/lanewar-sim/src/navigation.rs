//! Host navigation seam.
//!
//! When a `Navigator` is attached, unit movement is delegated to it: the AI
//! sets destinations and reads back velocities. Without one, units step
//! straight toward their destination and ignore obstacles.

use lanewar_core::types::{Position, UnitId, Velocity};

pub trait Navigator {
    /// Steer `unit` toward `destination`.
    fn set_destination(&mut self, unit: UnitId, destination: Position);
    /// Clear any active destination for `unit`.
    fn stop(&mut self, unit: UnitId);
    /// Current velocity of the navigation agent backing `unit`.
    fn velocity(&self, unit: UnitId) -> Velocity;
    fn at_destination(&self, unit: UnitId) -> bool;
    /// Switch `unit` between a moving agent and a static obstacle that
    /// other agents route around.
    fn set_obstacle_mode(&mut self, unit: UnitId, obstacle: bool);
}
