//! Error types for the instance, client and harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while loading, serving or querying an instance.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Instance options name no project folder.
    #[error("missing project folder")]
    MissingProjectFolder,

    /// Extension folder lacks a plugin manifest.
    #[error("not a plugin: '{}' has no manifest", .0.display())]
    NotAPlugin(PathBuf),

    /// Route definition cannot be used.
    #[error("invalid route '{key}': {reason}")]
    InvalidRoute { key: String, reason: String },

    /// Request URL cannot be resolved.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Request header cannot be used.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Reading a project file failed.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging error.
    #[error(transparent)]
    Stager(#[from] stagehand_fs::StagerError),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] stagehand_core::CoreError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Background task failed.
    #[error("task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
