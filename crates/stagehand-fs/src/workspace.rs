//! Workspace directories and their teardown.

use crate::error::{Result, StagerError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Attempts at finding an unused workspace name.
const MAX_CREATE_ATTEMPTS: usize = 8;

/// What a staging pass put into a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    /// Files copied from the snapshot source.
    pub files_copied: usize,
    /// Seed files written.
    pub files_seeded: usize,
}

/// A temporary project directory below the scratch root.
///
/// The workspace is owned by whoever staged it and is removed by
/// [`Workspace::teardown`].
#[derive(Debug)]
pub struct Workspace {
    /// Root path of the workspace.
    root: PathBuf,
    /// Shared parent directory.
    scratch_root: PathBuf,
    /// Creation timestamp.
    created_at: DateTime<Utc>,
    /// Staging statistics.
    stats: StageStats,
}

impl Workspace {
    /// Create a new, empty, uniquely named workspace.
    ///
    /// The scratch root is created if missing. A concurrent teardown may
    /// remove the scratch root between its creation and ours, in which case
    /// it is created again.
    pub(crate) fn create(scratch_root: &Path) -> Result<Self> {
        let mut last_error = None;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            fs::create_dir_all(scratch_root).map_err(StagerError::io(scratch_root))?;

            let root = scratch_root.join(Uuid::new_v4().simple().to_string());

            match fs::create_dir(&root) {
                Ok(()) => {
                    info!(path = %root.display(), "Created workspace");
                    return Ok(Self {
                        root,
                        scratch_root: scratch_root.to_path_buf(),
                        created_at: Utc::now(),
                        stats: StageStats::default(),
                    });
                }
                Err(e) if matches!(e.kind(), ErrorKind::AlreadyExists | ErrorKind::NotFound) => {
                    debug!(path = %root.display(), error = %e, "Retrying workspace creation");
                    last_error = Some(StagerError::Io { path: root, source: e });
                }
                Err(e) => return Err(StagerError::Io { path: root, source: e }),
            }
        }

        Err(last_error.unwrap_or_else(|| StagerError::Io {
            path: scratch_root.to_path_buf(),
            source: ErrorKind::AlreadyExists.into(),
        }))
    }

    /// Get the workspace root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the scratch root this workspace lives under.
    #[must_use]
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Time elapsed since the workspace was created.
    #[must_use]
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.created_at
    }

    /// Get the staging statistics.
    #[must_use]
    pub const fn stats(&self) -> StageStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut StageStats {
        &mut self.stats
    }

    /// Remove the workspace, then the scratch root if nothing else is left.
    ///
    /// With `keep_files` set nothing is removed.
    ///
    /// # Errors
    /// Returns error if the workspace cannot be removed. Failing to remove
    /// the scratch root because it is gone or still in use is not an error.
    pub fn teardown(self, keep_files: bool) -> Result<()> {
        if keep_files {
            info!(path = %self.root.display(), "Keeping workspace");
            return Ok(());
        }

        fs::remove_dir_all(&self.root).map_err(StagerError::io(&self.root))?;
        info!(
            path = %self.root.display(),
            age_ms = self.age().num_milliseconds(),
            "Removed workspace"
        );

        remove_if_empty(&self.scratch_root)
    }
}

/// Remove a directory unless other entries remain in it.
fn remove_if_empty(dir: &Path) -> Result<()> {
    match fs::remove_dir(dir) {
        Ok(()) => {
            info!(path = %dir.display(), "Removed scratch root");
            Ok(())
        }
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty | ErrorKind::AlreadyExists
            ) =>
        {
            debug!(path = %dir.display(), error = %e, "Scratch root left in place");
            Ok(())
        }
        Err(e) => Err(StagerError::Io {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_makes_scratch_root() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("nested").join("$stagehand-dev");

        let ws = Workspace::create(&scratch).unwrap();

        assert!(ws.root().is_dir());
        assert_eq!(ws.root().parent(), Some(scratch.as_path()));
        assert_eq!(ws.root().file_name().unwrap().len(), 32);
        assert_eq!(ws.stats(), StageStats::default());
    }

    #[test]
    fn test_teardown_keeps_shared_scratch_root() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("$stagehand-dev");

        let first = Workspace::create(&scratch).unwrap();
        let second = Workspace::create(&scratch).unwrap();
        let first_root = first.root().to_path_buf();

        first.teardown(false).unwrap();
        assert!(!first_root.exists());
        assert!(scratch.is_dir());

        second.teardown(false).unwrap();
        assert!(!scratch.exists());
    }

    #[test]
    fn test_teardown_keep_files() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("$stagehand-dev");

        let ws = Workspace::create(&scratch).unwrap();
        let root = ws.root().to_path_buf();
        fs::write(root.join("a"), "kept").unwrap();

        ws.teardown(true).unwrap();
        assert_eq!(fs::read_to_string(root.join("a")).unwrap(), "kept");
    }

    #[test]
    fn test_teardown_reports_failed_removal() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("$stagehand-dev");

        let ws = Workspace::create(&scratch).unwrap();
        let root = ws.root().to_path_buf();
        fs::remove_dir(&root).unwrap();

        match ws.teardown(false) {
            Err(StagerError::Io { path, source }) => {
                assert_eq!(path, root);
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("expected removal failure, got {other:?}"),
        }
    }

    #[test]
    fn test_parallel_teardowns_remove_scratch_root() {
        let tmp = TempDir::new().unwrap();
        let scratch = tmp.path().join("$stagehand-dev");

        let workspaces: Vec<_> = (0..16)
            .map(|_| Workspace::create(&scratch).unwrap())
            .collect();
        assert!(workspaces.iter().all(|ws| ws.age() >= TimeDelta::zero()));

        std::thread::scope(|scope| {
            for ws in workspaces {
                scope.spawn(move || ws.teardown(false).unwrap());
            }
        });

        assert!(!scratch.exists());
        assert!(tmp.path().is_dir());
    }

    #[test]
    fn test_remove_if_empty_tolerates_missing_dir() {
        let tmp = TempDir::new().unwrap();
        remove_if_empty(&tmp.path().join("gone")).unwrap();
    }
}
