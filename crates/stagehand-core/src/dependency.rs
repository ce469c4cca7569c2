//! Plugin dependency naming.
//!
//! Plugins are distributed as packages named `stagehand-plugin-<name>`.
//! Any name already carrying the `stagehand-` prefix is taken verbatim.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix reserved for packages of the stagehand ecosystem.
pub const RESERVED_PREFIX: &str = "stagehand-";
/// Prefix added to bare plugin names.
pub const PLUGIN_PREFIX: &str = "stagehand-plugin-";
/// Manifest file marking a directory as a stagehand plugin.
pub const MANIFEST_FILE: &str = "stagehand.json";

/// A normalized plugin package name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencyName(String);

impl DependencyName {
    /// Parse and normalize a dependency name.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidDependencyName` for empty names, names
    /// containing whitespace or path separators, and option-like names.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim();

        if name.is_empty()
            || name.starts_with('-')
            || name.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(CoreError::InvalidDependencyName(raw.to_string()));
        }

        if name.starts_with(RESERVED_PREFIX) {
            Ok(Self(name.to_string()))
        } else {
            Ok(Self(format!("{PLUGIN_PREFIX}{name}")))
        }
    }

    /// The package name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DependencyName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DependencyName> for String {
    fn from(value: DependencyName) -> Self {
        value.0
    }
}

/// Contents of a plugin's `stagehand.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name, defaults to the directory name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PluginManifest {
    /// Parse a manifest document.
    ///
    /// # Errors
    /// Returns `CoreError::Json` if the document is malformed.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
