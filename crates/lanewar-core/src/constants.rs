//! Simulation constants and tuning parameters.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

/// Maximum time scale accepted by `SetTimeScale`.
pub const MAX_TIME_SCALE: f64 = 4.0;

// --- Units ---

/// Default per-level stat growth (5% compounding per level above 1).
pub const DEFAULT_PER_LEVEL_PERCENT: f64 = 0.05;

/// Default move speed (world units per second).
pub const DEFAULT_MOVE_SPEED: f32 = 2.0;

/// Default attack range (world units).
pub const DEFAULT_ATTACK_RANGE: f32 = 1.2;

/// Default attack cooldown (seconds).
pub const DEFAULT_ATTACK_COOLDOWN: f64 = 1.0;

/// Default maximum health.
pub const DEFAULT_MAX_HEALTH: u32 = 100;

/// Seconds a dead unit lingers (death presentation) before it is despawned.
pub const DEATH_GRACE_SECS: f64 = 2.0;

// --- Attack timing ---

/// Windup length used when the engine schedules hits itself.
pub const DEFAULT_WINDUP_SECS: f64 = 0.35;

// --- Projectiles ---

/// Ranged projectile travel speed.
pub const ARROW_SPEED: f32 = 8.0;

/// Distance at which a ranged projectile counts as a hit.
pub const ARROW_IMPACT_RADIUS: f32 = 0.2;

/// Meteor travel speed.
pub const METEOR_FALL_SPEED: f32 = 10.0;

/// Distance at which a meteor counts as a hit.
pub const METEOR_IMPACT_RADIUS: f32 = 0.2;

/// Meteor spawn height above its target.
pub const METEOR_SPAWN_HEIGHT: f32 = 5.0;

/// Default splash radius around a meteor impact.
pub const SPLASH_RADIUS: f32 = 1.5;

/// Default fraction of primary damage dealt as splash.
pub const SPLASH_FRACTION: f64 = 0.5;

// --- Chain lightning ---

/// Default maximum distance between consecutive chain links.
pub const CHAIN_RANGE: f32 = 3.0;

/// Default number of extra hops after the primary target.
pub const CHAIN_MAX_BOUNCES: u32 = 1;

/// Default damage multiplier for links after the first.
pub const CHAIN_SECONDARY_MULTIPLIER: f64 = 0.5;

// --- Movement ---

/// Radius of the per-target lateral approach offset.
pub const APPROACH_OFFSET_RADIUS: f32 = 0.4;

/// Seconds a parked idle unit waits before becoming a static obstacle.
pub const OBSTACLE_IDLE_SECS: f64 = 1.0;

// --- Rounds ---

/// Delay between the last pick and the start of combat.
pub const START_BATTLE_DELAY_SECS: f64 = 2.0;

/// Lower bound on a round's pick quota.
pub const MIN_PLAYER_PICKS: u32 = 1;

/// Souls granted by a soul drop.
pub const SOULS_PER_DROP: u32 = 1;

// --- Formation ---

/// Units per formation row before wrapping to the next row.
pub const MAX_UNITS_PER_ROW: usize = 8;

/// Horizontal spacing between units in a row.
pub const FORMATION_CELL_SPACING: f32 = 1.5;

/// Spacing between successive rows of the same line.
pub const FORMATION_ROW_SPACING: f32 = 1.2;

/// Distance of the melee line in front of the ranged line.
pub const FORMATION_FRONT_OFFSET: f32 = 1.5;

/// Distance of each team's formation origin from the lane centre.
pub const FORMATION_HALF_GAP: f32 = 4.0;
