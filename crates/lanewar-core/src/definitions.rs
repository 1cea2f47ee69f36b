//! Unit and level definitions, and the level-scaling rule.
//!
//! Definitions are external data, normally authored as TOML:
//!
//! ```toml
//! [[unit]]
//! id = "lightning_mage"
//! archetype = "Ranged"
//! damage = 20
//! attack = { kind = "Chain", max_bounces = 2 }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::{Archetype, AttackKind};
use crate::error::{ConfigError, DefinitionError};

/// How a unit resolves its attacks. Selected once at spawn, immutable after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AttackProfile {
    /// Damage lands directly on the pending target.
    #[default]
    Melee,
    /// Fires a seeking projectile that tracks the target's live position.
    Ranged {
        #[serde(default = "default_arrow_speed")]
        projectile_speed: f32,
        #[serde(default = "default_arrow_impact_radius")]
        impact_radius: f32,
    },
    /// Chain lightning: primary target plus nearest-neighbour hops.
    Chain {
        #[serde(default = "default_chain_range")]
        chain_range: f32,
        #[serde(default = "default_chain_max_bounces")]
        max_bounces: u32,
        #[serde(default = "default_chain_secondary_multiplier")]
        secondary_multiplier: f64,
    },
    /// Homing meteor with splash damage on impact.
    AreaSplash {
        #[serde(default = "default_meteor_fall_speed")]
        fall_speed: f32,
        #[serde(default = "default_meteor_impact_radius")]
        impact_radius: f32,
        #[serde(default = "default_splash_radius")]
        splash_radius: f32,
        #[serde(default = "default_splash_fraction")]
        splash_fraction: f64,
        #[serde(default = "default_meteor_spawn_height")]
        spawn_height: f32,
    },
}

impl AttackProfile {
    pub fn kind(&self) -> AttackKind {
        match self {
            AttackProfile::Melee => AttackKind::Melee,
            AttackProfile::Ranged { .. } => AttackKind::Ranged,
            AttackProfile::Chain { .. } => AttackKind::Chain,
            AttackProfile::AreaSplash { .. } => AttackKind::AreaSplash,
        }
    }

    /// Default ranged profile.
    pub fn ranged() -> Self {
        AttackProfile::Ranged {
            projectile_speed: ARROW_SPEED,
            impact_radius: ARROW_IMPACT_RADIUS,
        }
    }

    /// Default chain lightning profile.
    pub fn chain() -> Self {
        AttackProfile::Chain {
            chain_range: CHAIN_RANGE,
            max_bounces: CHAIN_MAX_BOUNCES,
            secondary_multiplier: CHAIN_SECONDARY_MULTIPLIER,
        }
    }

    /// Default meteor profile.
    pub fn area_splash() -> Self {
        AttackProfile::AreaSplash {
            fall_speed: METEOR_FALL_SPEED,
            impact_radius: METEOR_IMPACT_RADIUS,
            splash_radius: SPLASH_RADIUS,
            splash_fraction: SPLASH_FRACTION,
            spawn_height: METEOR_SPAWN_HEIGHT,
        }
    }
}

/// Static description of a unit type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub archetype: Archetype,
    /// Units spawned per pick.
    #[serde(default = "default_spawn_count")]
    pub spawn_count: u32,
    /// Souls spent to pick this unit.
    #[serde(default)]
    pub soul_cost: u32,
    /// Chance (0..=1) that this unit drops a soul when it dies as an enemy.
    #[serde(default = "default_soul_drop_chance")]
    pub soul_drop_chance: f64,
    #[serde(default = "default_max_health")]
    pub max_health: u32,
    #[serde(default)]
    pub damage: u32,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    #[serde(default = "default_attack_cooldown")]
    pub attack_cooldown: f64,
    #[serde(default)]
    pub attack: AttackProfile,
    #[serde(default = "default_per_level_percent")]
    pub per_level_percent: f64,
}

impl UnitDefinition {
    /// A definition with default stats; handy for tests and tools.
    pub fn new(id: impl Into<String>, archetype: Archetype, attack: AttackProfile) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            archetype,
            spawn_count: default_spawn_count(),
            soul_cost: 0,
            soul_drop_chance: default_soul_drop_chance(),
            max_health: DEFAULT_MAX_HEALTH,
            damage: 10,
            move_speed: DEFAULT_MOVE_SPEED,
            attack_range: DEFAULT_ATTACK_RANGE,
            attack_cooldown: DEFAULT_ATTACK_COOLDOWN,
            attack,
            per_level_percent: DEFAULT_PER_LEVEL_PERCENT,
        }
    }

    /// Check that every stat is usable by the simulation.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let invalid = |stat: &'static str, reason: &str| DefinitionError::InvalidStat {
            id: self.id.clone(),
            stat,
            reason: reason.to_string(),
        };

        if self.max_health == 0 {
            return Err(invalid("max_health", "must be positive"));
        }
        if !(self.move_speed.is_finite() && self.move_speed >= 0.0) {
            return Err(invalid("move_speed", "must be finite and non-negative"));
        }
        if !(self.attack_range.is_finite() && self.attack_range >= 0.0) {
            return Err(invalid("attack_range", "must be finite and non-negative"));
        }
        if !(self.attack_cooldown.is_finite() && self.attack_cooldown >= 0.0) {
            return Err(invalid("attack_cooldown", "must be finite and non-negative"));
        }
        if !(0.0..=1.0).contains(&self.soul_drop_chance) {
            return Err(invalid("soul_drop_chance", "must be within 0..=1"));
        }
        if self.spawn_count == 0 {
            return Err(invalid("spawn_count", "must be at least 1"));
        }
        match self.attack {
            AttackProfile::Chain {
                chain_range,
                secondary_multiplier,
                ..
            } if chain_range < 0.0 || secondary_multiplier < 0.0 => {
                Err(invalid("attack", "chain range and multiplier must be non-negative"))
            }
            AttackProfile::AreaSplash {
                splash_radius,
                splash_fraction,
                ..
            } if splash_radius < 0.0 || !(0.0..=1.0).contains(&splash_fraction) => {
                Err(invalid("attack", "splash radius must be non-negative, fraction within 0..=1"))
            }
            _ => Ok(()),
        }
    }
}

/// Stats fixed at spawn from a definition and a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStats {
    pub max_health: u32,
    pub damage: u32,
    pub move_speed: f32,
    pub attack_range: f32,
    pub attack_cooldown: f64,
}

impl ResolvedStats {
    /// Apply level scaling to health and damage. Speed, range and cooldown are level-independent.
    pub fn resolve(def: &UnitDefinition, level: u32) -> Self {
        Self {
            max_health: scaled_stat(def.max_health, level, def.per_level_percent).max(1),
            damage: scaled_stat(def.damage, level, def.per_level_percent),
            move_speed: def.move_speed,
            attack_range: def.attack_range,
            attack_cooldown: def.attack_cooldown,
        }
    }
}

/// `round(base * (1 + per_level_percent)^(level - 1))`. Level 0 is treated as level 1.
pub fn scaled_stat(base: u32, level: u32, per_level_percent: f64) -> u32 {
    let exponent = level.saturating_sub(1) as i32;
    let scaled = base as f64 * (1.0 + per_level_percent).powi(exponent);
    if scaled.is_finite() && scaled > 0.0 {
        scaled.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Scale a damage value by a fraction, rounded to the nearest integer.
pub fn scale_damage(damage: u32, factor: f64) -> u32 {
    let scaled = damage as f64 * factor;
    if scaled.is_finite() && scaled > 0.0 {
        scaled.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// All unit definitions known to a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitCatalog {
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitDefinition>,
}

impl UnitCatalog {
    pub fn new(units: Vec<UnitDefinition>) -> Result<Self, DefinitionError> {
        let catalog = Self { units };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&UnitDefinition> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id.as_str()) {
                return Err(DefinitionError::DuplicateUnit(unit.id.clone()));
            }
            unit.validate()?;
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let catalog: UnitCatalog = toml::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// One line of an enemy wave manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpawnEntry {
    pub unit: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_level")]
    pub level: u32,
}

/// A single round: the enemy wave and the player's pick quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDefinition {
    #[serde(default, rename = "enemy")]
    pub enemy_spawns: Vec<EnemySpawnEntry>,
    #[serde(default = "default_player_picks")]
    pub player_picks: u32,
    /// Souls granted when this round is won.
    #[serde(default)]
    pub souls_reward: u32,
}

impl RoundDefinition {
    pub fn enemy_count(&self) -> u32 {
        self.enemy_spawns.iter().map(|e| e.count).sum()
    }
}

/// Ordered rounds that make up one level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "round")]
    pub rounds: Vec<RoundDefinition>,
}

impl LevelDefinition {
    pub fn rounds_count(&self) -> usize {
        self.rounds.len()
    }

    /// Check that the level has rounds and every referenced unit exists.
    pub fn validate(&self, catalog: &UnitCatalog) -> Result<(), DefinitionError> {
        if self.rounds.is_empty() {
            return Err(DefinitionError::EmptyLevel);
        }
        for (index, round) in self.rounds.iter().enumerate() {
            self.validate_round(index, round, catalog)?;
        }
        Ok(())
    }

    fn validate_round(
        &self,
        index: usize,
        round: &RoundDefinition,
        catalog: &UnitCatalog,
    ) -> Result<(), DefinitionError> {
        if round.enemy_count() == 0 {
            return Err(DefinitionError::EmptyRoster { round: index });
        }
        for entry in &round.enemy_spawns {
            if catalog.get(&entry.unit).is_none() {
                return Err(DefinitionError::UnknownUnit(entry.unit.clone()));
            }
            if entry.level == 0 {
                return Err(DefinitionError::InvalidStat {
                    id: entry.unit.clone(),
                    stat: "level",
                    reason: format!("round {index} spawns level 0"),
                });
            }
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

fn default_spawn_count() -> u32 {
    1
}
fn default_soul_drop_chance() -> f64 {
    0.25
}
fn default_max_health() -> u32 {
    DEFAULT_MAX_HEALTH
}
fn default_move_speed() -> f32 {
    DEFAULT_MOVE_SPEED
}
fn default_attack_range() -> f32 {
    DEFAULT_ATTACK_RANGE
}
fn default_attack_cooldown() -> f64 {
    DEFAULT_ATTACK_COOLDOWN
}
fn default_per_level_percent() -> f64 {
    DEFAULT_PER_LEVEL_PERCENT
}
fn default_count() -> u32 {
    1
}
fn default_level() -> u32 {
    1
}
fn default_player_picks() -> u32 {
    3
}
fn default_arrow_speed() -> f32 {
    ARROW_SPEED
}
fn default_arrow_impact_radius() -> f32 {
    ARROW_IMPACT_RADIUS
}
fn default_chain_range() -> f32 {
    CHAIN_RANGE
}
fn default_chain_max_bounces() -> u32 {
    CHAIN_MAX_BOUNCES
}
fn default_chain_secondary_multiplier() -> f64 {
    CHAIN_SECONDARY_MULTIPLIER
}
fn default_meteor_fall_speed() -> f32 {
    METEOR_FALL_SPEED
}
fn default_meteor_impact_radius() -> f32 {
    METEOR_IMPACT_RADIUS
}
fn default_splash_radius() -> f32 {
    SPLASH_RADIUS
}
fn default_splash_fraction() -> f64 {
    SPLASH_FRACTION
}
fn default_meteor_spawn_height() -> f32 {
    METEOR_SPAWN_HEIGHT
}
