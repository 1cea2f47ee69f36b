//! Tunable combat and formation configuration.
//!
//! Every struct has a `Default` matching the shipped game feel and can be
//! overridden from TOML; missing keys fall back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;

/// How a unit picks its target each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy")]
pub enum RetargetPolicy {
    /// Re-acquire the nearest enemy every tick.
    #[default]
    Nearest,
    /// Keep the current target while it is alive unless a candidate is
    /// closer by more than `switch_margin`.
    Sticky { switch_margin: f32 },
}

/// How the deferred hit of an attack (phase 2) is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum WindupMode {
    /// The engine schedules the hit `secs` after the attack starts.
    Timeline { secs: f64 },
    /// The host delivers `Command::ResolveHit` from its animation timeline.
    External,
}

impl Default for WindupMode {
    fn default() -> Self {
        WindupMode::Timeline {
            secs: DEFAULT_WINDUP_SECS,
        }
    }
}

/// Combat tuning shared by every unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Seconds a corpse lingers before it is despawned.
    pub death_grace_secs: f64,
    /// Delay between meeting the pick quota and the start of combat.
    pub start_battle_delay_secs: f64,
    pub retarget: RetargetPolicy,
    pub windup: WindupMode,
    /// Intents older than this are dropped without effect. `None` = no cap.
    pub max_windup_secs: Option<f64>,
    /// Parked-idle time before a navigator-driven unit becomes an obstacle.
    pub obstacle_idle_secs: f64,
    /// Radius of the per-target lateral approach offset.
    pub approach_offset_radius: f32,
    /// Level at which player picks are spawned.
    pub player_unit_level: u32,
    /// Souls in the bank when a level starts.
    pub starting_souls: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            death_grace_secs: DEATH_GRACE_SECS,
            start_battle_delay_secs: START_BATTLE_DELAY_SECS,
            retarget: RetargetPolicy::default(),
            windup: WindupMode::default(),
            max_windup_secs: None,
            obstacle_idle_secs: OBSTACLE_IDLE_SECS,
            approach_offset_radius: APPROACH_OFFSET_RADIUS,
            player_unit_level: 1,
            starting_souls: 0,
        }
    }
}

impl CombatConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Geometry of one team's formation grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationLayout {
    /// Centre of the ranged (back) line.
    pub origin: [f32; 2],
    /// +1.0 if the enemy lies toward +y, -1.0 otherwise.
    pub forward: f32,
    pub cell_spacing: f32,
    pub row_spacing: f32,
    /// Distance of the melee line in front of the ranged line.
    pub front_offset: f32,
    pub max_per_row: usize,
}

impl Default for FormationLayout {
    fn default() -> Self {
        Self {
            origin: [0.0, -FORMATION_HALF_GAP],
            forward: 1.0,
            cell_spacing: FORMATION_CELL_SPACING,
            row_spacing: FORMATION_ROW_SPACING,
            front_offset: FORMATION_FRONT_OFFSET,
            max_per_row: MAX_UNITS_PER_ROW,
        }
    }
}

impl FormationLayout {
    /// Default layout for the enemy side, mirrored across the lane centre.
    pub fn enemy_side() -> Self {
        Self {
            origin: [0.0, FORMATION_HALF_GAP],
            forward: -1.0,
            ..Self::default()
        }
    }
}

/// Formation layouts for both teams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationConfig {
    #[serde(default)]
    pub ally: FormationLayout,
    #[serde(default = "FormationLayout::enemy_side")]
    pub enemy: FormationLayout,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            ally: FormationLayout::default(),
            enemy: FormationLayout::enemy_side(),
        }
    }
}
