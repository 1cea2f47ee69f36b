//! ECS systems that operate on the simulation world each tick.
//!
//! Systems are free functions over `&mut World` plus the engine-side state
//! they need. They do not own state; it lives in components or on the engine.

pub mod attack;
pub mod damage;
pub mod death;
pub mod formation;
pub mod projectiles;
pub mod snapshot;
pub mod unit_ai;
