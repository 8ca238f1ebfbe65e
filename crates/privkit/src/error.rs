//! Error types for privkit.

use std::path::PathBuf;

use privkit_core::{CoreError, ValidationError};
use privkit_store::StoreError;
use thiserror::Error;

/// Errors that can occur during toolkit operations.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// Caller supplied a wrong-shaped argument. Nothing was read or written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Codec error outside of a document read.
    #[error("codec error: {0}")]
    Codec(#[from] CoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A registered consent strategy failed.
    #[error("consent strategy {name:?} failed: {reason}")]
    Strategy { name: String, reason: String },

    /// A breach notifier failed to deliver.
    #[error("breach notification failed: {0}")]
    Notifier(String),

    /// Background task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Errors raised while loading [`ToolkitConfig`](crate::ToolkitConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No encryption key was configured.
    #[error("no encryption key configured (set PRIVKIT_ENCRYPTION_KEY)")]
    MissingEncryptionKey,

    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override has an unusable value.
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: String, value: String },
}

/// Result type for toolkit operations.
pub type Result<T> = std::result::Result<T, ComplianceError>;
