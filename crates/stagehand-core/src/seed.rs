//! File seed sets.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Literal file contents keyed by path relative to a workspace root.
///
/// Entries are applied in path order. Paths use `/` as separator on every
/// platform, e.g. `config/auth.yml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSeedSet {
    entries: BTreeMap<String, String>,
}

impl FileSeedSet {
    /// Create an empty seed set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content for the same path.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add a file, returning the content it replaced.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.entries.insert(path.into(), content.into())
    }

    /// Number of seeded files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check every path without touching the filesystem.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidSeedPath` for the first path that is empty,
    /// absolute, or contains a `..` component.
    pub fn validate(&self) -> Result<()> {
        for path in self.entries.keys() {
            relative_path(path)?;
        }
        Ok(())
    }

    /// Resolve every entry to its destination below `root`.
    ///
    /// # Errors
    /// Same conditions as [`FileSeedSet::validate`].
    pub fn resolve<'a>(&'a self, root: &Path) -> Result<Vec<(PathBuf, &'a str)>> {
        self.entries
            .iter()
            .map(|(path, content)| Ok((root.join(relative_path(path)?), content.as_str())))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for FileSeedSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Normalize a seed key into a relative path that stays inside the workspace.
fn relative_path(raw: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();

    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CoreError::InvalidSeedPath(raw.to_string()));
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(CoreError::InvalidSeedPath(raw.to_string()));
    }

    Ok(out)
}
