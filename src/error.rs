//! Error types for the data-source engine.

use crate::types::IndexPath;
use thiserror::Error;

/// Main error type for engine operations.
///
/// Errors are scoped to the single modification that produced them and are
/// cloned out to every listener, so every variant carries owned data.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Index path {path} out of bounds ({len} items in section)")]
    ItemOutOfBounds { path: IndexPath, len: usize },

    #[error("Section {section} out of bounds ({count} sections)")]
    SectionOutOfBounds { section: usize, count: usize },

    #[error("Conflicting operations on {0}")]
    Conflict(String),

    #[error("Render failed for {path}: {message}")]
    Render { path: IndexPath, message: String },

    #[error("Modification failed: {0}")]
    Modification(String),

    #[error("Scheduler unavailable")]
    SchedulerUnavailable,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Data source was dropped before the modification completed")]
    Disconnected,
}

impl EngineError {
    /// Whether this error came from changeset validation rather than rendering.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::ItemOutOfBounds { .. }
                | EngineError::SectionOutOfBounds { .. }
                | EngineError::Conflict(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::InvalidConfig(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
