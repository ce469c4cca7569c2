//! stagehand-core: Domain models shared by the stager, the framework instance
//! and the dependency CLI.
//!
//! This crate provides:
//! - `FileSeedSet`: literal file contents to materialize inside a workspace
//! - `StageOptions`: what a staging pass should produce
//! - Config merge helpers built on JSON Merge Patch
//! - `DependencyName`: plugin naming rules shared with `stagehand-pm`

pub mod dependency;
pub mod error;
pub mod merge;
pub mod options;
pub mod seed;

pub use dependency::{DependencyName, PluginManifest, MANIFEST_FILE};
pub use error::{CoreError, Result};
pub use merge::{apply_merge_patch, lookup, merge_document, resolve_path};
pub use options::StageOptions;
pub use seed::FileSeedSet;
