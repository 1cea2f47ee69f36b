//! Unit AI for LANEWAR.
//!
//! Implements the per-unit combat decision state machine, target
//! selection policies, and the navigator parking policy.

pub mod fsm;
pub mod parking;
pub mod targeting;

pub use lanewar_core as core;
