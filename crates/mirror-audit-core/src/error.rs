//! Domain-level error taxonomy for mirror-audit.

use std::path::PathBuf;

/// Errors produced outside of individual verification levels.
///
/// Level faults never surface here; they are classified as `ERROR` inside the
/// [`LevelResult`](crate::domain::LevelResult) of the level that hit them.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("invalid verification level: {0}")]
    InvalidLevel(String),

    #[error("level selection must not be empty")]
    EmptyLevelSelection,

    #[error("invalid audit configuration: {0}")]
    InvalidConfig(String),

    #[error("repository discovery failed under {path:?}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mirror-audit domain operations.
pub type Result<T> = std::result::Result<T, AuditError>;
