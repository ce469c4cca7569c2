//! Recursive snapshot copy of a project directory.

use crate::config::StagerConfig;
use crate::error::{Result, StagerError};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Copy every file below `source` into `dest`, one file at a time.
///
/// Directories listed in `config.ignored_dirs` are skipped entirely.
/// Returns the number of files copied.
pub(crate) fn copy_tree(source: &Path, dest: &Path, config: &StagerConfig) -> Result<usize> {
    let meta = fs::metadata(source).map_err(StagerError::io(source))?;
    if !meta.is_dir() {
        return Err(StagerError::Io {
            path: source.to_path_buf(),
            source: Error::from(ErrorKind::NotADirectory),
        });
    }

    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !config.is_ignored(&entry.file_name().to_string_lossy())
        });

    let mut copied = 0;

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        // Symlinks are copied by content when they resolve to a file.
        if entry.file_type().is_symlink() && !entry.path().is_file() {
            debug!(path = %entry.path().display(), "Skipping link without file target");
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        let content = fs::read(entry.path()).map_err(StagerError::io(entry.path()))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(StagerError::io(parent))?;
        }
        fs::write(&target, content).map_err(StagerError::io(&target))?;

        debug!(file = %relative.display(), "Copied snapshot file");
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copies_nested_files_and_skips_vcs() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        fs::create_dir_all(src.path().join("config/deep")).unwrap();
        fs::create_dir_all(src.path().join(".git/objects")).unwrap();
        fs::write(src.path().join("index.txt"), "root").unwrap();
        fs::write(src.path().join("config/deep/x.json"), "{}").unwrap();
        fs::write(src.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::write(src.path().join(".git/objects/ab"), "blob").unwrap();

        let copied = copy_tree(src.path(), dest.path(), &StagerConfig::default()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dest.path().join("index.txt")).unwrap(), "root");
        assert_eq!(
            fs::read_to_string(dest.path().join("config/deep/x.json")).unwrap(),
            "{}"
        );
        assert!(!dest.path().join(".git").exists());
    }

    #[test]
    fn test_ignored_names_only_apply_to_directories() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(src.path().join(".git"), "gitdir: ../elsewhere").unwrap();

        let copied = copy_tree(src.path(), dest.path(), &StagerConfig::default()).unwrap();

        assert_eq!(copied, 1);
        assert!(dest.path().join(".git").is_file());
    }

    #[test]
    fn test_source_must_be_directory() {
        let src = TempDir::new().unwrap();
        let file = src.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let err = copy_tree(&file, src.path(), &StagerConfig::default()).unwrap_err();
        assert!(matches!(err, StagerError::Io { ref path, .. } if path == &file));

        let missing = src.path().join("missing");
        let err = copy_tree(&missing, src.path(), &StagerConfig::default()).unwrap_err();
        assert!(
            matches!(err, StagerError::Io { ref source, .. } if source.kind() == ErrorKind::NotFound)
        );
    }
}
