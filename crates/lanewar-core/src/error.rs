//! Error types for definition loading and validation.
//!
//! The per-tick simulation path never returns these; they surface when
//! catalogs, levels, or config files are loaded, and when a round cannot
//! start because its data is missing.

use thiserror::Error;

/// Invalid or missing gameplay data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("unknown unit definition: {0}")]
    UnknownUnit(String),

    #[error("level has no rounds")]
    EmptyLevel,

    #[error("round {round} has no enemy spawns")]
    EmptyRoster { round: usize },

    #[error("round index {0} is out of range")]
    RoundOutOfRange(usize),

    #[error("unit {id}: invalid {stat} ({reason})")]
    InvalidStat {
        id: String,
        stat: &'static str,
        reason: String,
    },

    #[error("duplicate unit definition: {0}")]
    DuplicateUnit(String),
}

/// Failure to load a config, catalog, or level document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}
