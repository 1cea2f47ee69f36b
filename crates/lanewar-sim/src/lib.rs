//! Simulation engine for LANEWAR.
//!
//! Owns the hecs ECS world, the spatial registry, and the round controller;
//! runs systems once per tick and produces `GameStateSnapshot`s for the host.

pub mod combat;
pub mod economy;
pub mod engine;
pub mod navigation;
pub mod obstacles;
pub mod registry;
pub mod round;
pub mod schedule;
pub mod systems;
pub mod world_setup;

pub use engine::{SimConfig, SimulationEngine};
pub use lanewar_core as core;

#[cfg(test)]
mod tests;
