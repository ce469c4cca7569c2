//! Staging options.

use crate::seed::FileSeedSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Describes the project a staging pass should produce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageOptions {
    /// Existing project copied into the workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_project_folder: Option<PathBuf>,

    /// Files written into the workspace after the snapshot copy.
    #[serde(default, skip_serializing_if = "FileSeedSet::is_empty")]
    pub files: FileSeedSet,

    /// Stage a workspace even when there is nothing to copy or seed.
    #[serde(default)]
    pub use_tmp_path: bool,

    /// Project used in place when no staging is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_folder: Option<PathBuf>,
}

impl StageOptions {
    /// Create empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy an existing project into the workspace.
    #[must_use]
    pub fn with_snapshot(mut self, source: impl Into<PathBuf>) -> Self {
        self.test_project_folder = Some(source.into());
        self
    }

    /// Seed a file into the workspace.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path, content);
        self
    }

    /// Force staging of a fresh workspace.
    #[must_use]
    pub const fn isolated(mut self) -> Self {
        self.use_tmp_path = true;
        self
    }

    /// Use an existing project when nothing needs staging.
    #[must_use]
    pub fn with_project_folder(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_folder = Some(path.into());
        self
    }

    /// Whether these options call for a temporary workspace.
    #[must_use]
    pub fn requires_workspace(&self) -> bool {
        self.test_project_folder.is_some() || !self.files.is_empty() || self.use_tmp_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_workspace() {
        assert!(!StageOptions::new().requires_workspace());
        assert!(!StageOptions::new().with_project_folder("/srv/app").requires_workspace());
        assert!(StageOptions::new().with_file("a", "").requires_workspace());
        assert!(StageOptions::new().with_snapshot("/srv/app").requires_workspace());
        assert!(StageOptions::new().isolated().requires_workspace());
    }
}
