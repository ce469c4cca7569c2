//! Stager configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the scratch root below the platform temporary directory.
pub const SCRATCH_ROOT_NAME: &str = "$stagehand-dev";
/// Environment variable overriding the scratch root.
pub const SCRATCH_ROOT_ENV: &str = "STAGEHAND_SCRATCH_ROOT";

/// Where workspaces are created and what a snapshot skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagerConfig {
    /// Shared parent of all workspaces.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Directory names never copied from a snapshot source.
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join(SCRATCH_ROOT_NAME)
}

fn default_ignored_dirs() -> Vec<String> {
    [".git", ".hg", ".svn"].map(String::from).to_vec()
}

impl Default for StagerConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            ignored_dirs: default_ignored_dirs(),
        }
    }
}

impl StagerConfig {
    /// Create a config using the given scratch root.
    #[must_use]
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            ..Default::default()
        }
    }

    /// Create a config honouring `STAGEHAND_SCRATCH_ROOT` if set.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var_os(SCRATCH_ROOT_ENV) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::default(),
        }
    }

    /// Get the scratch root.
    #[must_use]
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Whether a directory name is skipped during snapshot copies.
    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scratch_root() {
        let config = StagerConfig::default();
        assert_eq!(config.scratch_root, std::env::temp_dir().join("$stagehand-dev"));
        assert!(config.is_ignored(".git"));
        assert!(!config.is_ignored("config"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: StagerConfig =
            serde_json::from_str(r#"{ "scratch_root": "/var/tmp/stage" }"#).unwrap();
        assert_eq!(config.scratch_root, PathBuf::from("/var/tmp/stage"));
        assert!(config.is_ignored(".svn"));
    }
}
