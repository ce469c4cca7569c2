//! The workspace stager.

use crate::config::StagerConfig;
use crate::error::{Result, StagerError};
use crate::snapshot::copy_tree;
use crate::workspace::Workspace;
use stagehand_core::StageOptions;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The project a staging pass resolved to.
#[derive(Debug)]
pub enum StagedProject {
    /// Existing project used in place.
    External(PathBuf),
    /// Freshly staged temporary workspace.
    Temporary(Workspace),
}

impl StagedProject {
    /// Effective project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        match self {
            Self::External(path) => path,
            Self::Temporary(ws) => ws.root(),
        }
    }

    /// The temporary workspace, if one was staged.
    #[must_use]
    pub const fn workspace(&self) -> Option<&Workspace> {
        match self {
            Self::External(_) => None,
            Self::Temporary(ws) => Some(ws),
        }
    }

    /// Root of the temporary workspace, if one was staged.
    #[must_use]
    pub fn temporary_folder(&self) -> Option<&Path> {
        self.workspace().map(Workspace::root)
    }

    /// Tear down the workspace. External projects are left untouched.
    ///
    /// # Errors
    /// See [`Workspace::teardown`].
    pub fn teardown(self, keep_files: bool) -> Result<()> {
        match self {
            Self::External(path) => {
                debug!(path = %path.display(), "Nothing to tear down for external project");
                Ok(())
            }
            Self::Temporary(ws) => ws.teardown(keep_files),
        }
    }
}

/// Stages temporary projects below a configured scratch root.
#[derive(Debug, Clone, Default)]
pub struct Stager {
    config: StagerConfig,
}

impl Stager {
    /// Create a stager with the given configuration.
    #[must_use]
    pub const fn new(config: StagerConfig) -> Self {
        Self { config }
    }

    /// Get the stager configuration.
    #[must_use]
    pub const fn config(&self) -> &StagerConfig {
        &self.config
    }

    /// Resolve the options into a ready project.
    ///
    /// A workspace is staged when the options name a snapshot source, seed
    /// files, or force isolation. Otherwise the existing project folder is
    /// used directly. The workspace is complete when this returns: the
    /// snapshot has been copied and all seeds written over it.
    ///
    /// # Errors
    /// Returns `StagerError::NoProjectSource` or a `Core` error for unusable
    /// options before touching the filesystem. Any filesystem failure aborts
    /// staging; the partially staged workspace is removed on a best-effort
    /// basis.
    pub fn stage(&self, options: &StageOptions) -> Result<StagedProject> {
        options.files.validate()?;

        if !options.requires_workspace() {
            return options
                .project_folder
                .clone()
                .map(StagedProject::External)
                .ok_or(StagerError::NoProjectSource);
        }

        let mut ws = Workspace::create(&self.config.scratch_root)?;

        if let Err(e) = self.populate(&mut ws, options) {
            let root = ws.root().to_path_buf();
            if let Err(cleanup) = ws.teardown(false) {
                warn!(path = %root.display(), error = %cleanup, "Failed to remove partial workspace");
            }
            return Err(e);
        }

        info!(
            path = %ws.root().display(),
            files_copied = ws.stats().files_copied,
            files_seeded = ws.stats().files_seeded,
            "Staged workspace"
        );

        Ok(StagedProject::Temporary(ws))
    }

    fn populate(&self, ws: &mut Workspace, options: &StageOptions) -> Result<()> {
        if let Some(source) = &options.test_project_folder {
            let copied = copy_tree(source, ws.root(), &self.config)?;
            ws.stats_mut().files_copied = copied;
        }

        for (target, content) in options.files.resolve(ws.root())? {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(StagerError::io(parent))?;
            }
            fs::write(&target, content).map_err(StagerError::io(&target))?;
            debug!(file = %target.display(), "Seeded file");
            ws.stats_mut().files_seeded += 1;
        }

        Ok(())
    }
}
