//! Target selection policies and approach offsets.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use lanewar_core::config::RetargetPolicy;
use lanewar_core::types::UnitId;

/// A possible target and its distance from the deciding unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: UnitId,
    pub distance: f32,
}

/// Pick this tick's target.
///
/// `current` is last tick's target if it is still a valid enemy; `nearest`
/// is the registry's nearest valid enemy.
pub fn choose_target(
    policy: RetargetPolicy,
    current: Option<Candidate>,
    nearest: Option<Candidate>,
) -> Option<UnitId> {
    match policy {
        RetargetPolicy::Nearest => nearest.map(|c| c.id),
        RetargetPolicy::Sticky { switch_margin } => match (current, nearest) {
            (Some(cur), Some(near)) if near.distance + switch_margin < cur.distance => {
                Some(near.id)
            }
            (Some(cur), _) => Some(cur.id),
            (None, near) => near.map(|c| c.id),
        },
    }
}

/// Roll a lateral offset uniformly inside a disc of `radius`.
pub fn roll_approach_offset<R: Rng>(rng: &mut R, radius: f32) -> Vec2 {
    if radius <= 0.0 {
        return Vec2::ZERO;
    }
    let angle: f32 = rng.gen_range(0.0..TAU);
    let r = radius * rng.gen_range(0.0f32..1.0).sqrt();
    Vec2::new(angle.cos(), angle.sin()) * r
}
