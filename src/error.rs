//! Error types for attack-set configuration.
//!
//! Runtime scheduling never errors: unavailable targets, failed starts and empty
//! registries all degrade to "no attack this cycle". Only loading and validating
//! configuration can fail.

use std::path::PathBuf;

/// Error type for attack-set configuration loading and validation
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("attack `{attack}`: {reason}")]
    Invalid { attack: String, reason: String },
    #[error("duplicate attack name `{0}`")]
    DuplicateName(String),
}

impl ConfigError {
    pub fn invalid(attack: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            attack: attack.to_string(),
            reason: reason.into(),
        }
    }
}
