//! Error types for workspace staging.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for staging operations.
pub type Result<T> = std::result::Result<T, StagerError>;

/// Errors that can occur while staging or tearing down a workspace.
#[derive(Debug, Error)]
pub enum StagerError {
    /// Nothing to stage and no existing project to fall back to.
    #[error("missing project source: give a project folder to copy, files to seed, or an existing project folder")]
    NoProjectSource,

    /// Filesystem operation failed.
    #[error("io error at '{}': {source}", path.display())]
    Io {
        /// Path the operation was working on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] stagehand_core::CoreError),
}

impl StagerError {
    /// Attach a path to an IO error.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
