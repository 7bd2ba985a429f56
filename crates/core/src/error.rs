//! Error types for crossndk
//!
//! Configuration-level errors shared by every crate in the workspace.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for settings and configuration handling
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error in {path:?}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} cannot be empty")]
    MissingSetting(&'static str),

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type alias for crossndk-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Shorthand for an invalid setting value
    pub fn invalid(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidValue {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error stems from user configuration rather than the filesystem
    pub fn is_configuration(&self) -> bool {
        !matches!(self, CoreError::Io(_))
    }
}
