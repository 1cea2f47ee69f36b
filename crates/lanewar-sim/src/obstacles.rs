//! Static battlefield obstacles and line-of-sight checks.
//!
//! The field is flat; LOS is a straight segment test against each obstacle
//! footprint. An obstacle that contains either endpoint is ignored, so a
//! unit standing on a footprint edge is never blinded by it.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use lanewar_core::error::ConfigError;
use lanewar_core::types::Position;

/// A static obstacle footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Obstacle {
    Rect { min: [f32; 2], max: [f32; 2] },
    Circle { center: [f32; 2], radius: f32 },
}

impl Obstacle {
    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            Obstacle::Rect { min, max } => {
                point.x >= min[0] && point.x <= max[0] && point.y >= min[1] && point.y <= max[1]
            }
            Obstacle::Circle { center, radius } => {
                point.distance(Vec2::from(center)) <= radius
            }
        }
    }

    /// Whether the segment `a`-`b` crosses this footprint.
    pub fn blocks(&self, a: Vec2, b: Vec2) -> bool {
        match *self {
            Obstacle::Rect { min, max } => {
                segment_hits_rect(a, b, Vec2::from(min), Vec2::from(max))
            }
            Obstacle::Circle { center, radius } => {
                segment_hits_circle(a, b, Vec2::from(center), radius)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleMap {
    #[serde(default, rename = "obstacle")]
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleMap {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Check line-of-sight between two battlefield points.
///
/// Returns true if no obstacle footprint crosses the straight segment.
pub fn has_line_of_sight(map: &ObstacleMap, from: &Position, to: &Position) -> bool {
    let (a, b) = (from.0, to.0);
    !map
        .obstacles
        .iter()
        .filter(|o| !o.contains(a) && !o.contains(b))
        .any(|o| o.blocks(a, b))
}

/// Slab test of a segment against an axis-aligned box.
fn segment_hits_rect(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> bool {
    let d = b - a;
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;

    for axis in 0..2 {
        let (origin, dir, lo, hi) = (a[axis], d[axis], min[axis], max[axis]);
        if dir.abs() < f32::EPSILON {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let inv = 1.0 / dir;
        let mut t1 = (lo - origin) * inv;
        let mut t2 = (hi - origin) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_enter = t_enter.max(t1);
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return false;
        }
    }
    true
}

fn segment_hits_circle(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> bool {
    let d = b - a;
    let len_sq = d.length_squared();
    let t = if len_sq < f32::EPSILON {
        0.0
    } else {
        ((center - a).dot(d) / len_sq).clamp(0.0, 1.0)
    };
    (a + d * t).distance(center) < radius
}
