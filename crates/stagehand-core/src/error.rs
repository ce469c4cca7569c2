//! Error types for stagehand-core.

use thiserror::Error;

/// Result type alias for stagehand-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in stagehand-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Seed path is empty, absolute, or escapes the workspace.
    #[error("invalid seed path: '{0}'")]
    InvalidSeedPath(String),

    /// Dependency name cannot be used as a package name.
    #[error("invalid dependency name: {0}")]
    InvalidDependencyName(String),

    /// Configuration document has an unexpected shape.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
