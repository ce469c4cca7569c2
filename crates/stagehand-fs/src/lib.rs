//! Temporary workspace staging.
//!
//! A staging pass creates a uniquely named directory below a shared scratch
//! root and fills it with:
//! - a snapshot copy of an existing project (version-control metadata skipped)
//! - literal seed files, layered over the snapshot
//!
//! Teardown removes the workspace and, once empty, the scratch root.

pub mod config;
pub mod error;
mod snapshot;
pub mod stager;
pub mod workspace;

pub use config::StagerConfig;
pub use error::{Result, StagerError};
pub use stager::{StagedProject, Stager};
pub use workspace::{StageStats, Workspace};
