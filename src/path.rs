//! Canonical path resolution.
//!
//! Every tracked file is keyed by the path this module produces, so a file
//! reached through a relative path, an absolute path, or a symlink maps to a
//! single entry. Files that do not exist yet resolve through their deepest
//! existing ancestor, which gives them the same key they will have once
//! created.

use crate::error::ErrorKind;
use std::env;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("file path is empty")]
    Empty,

    #[error("malformed file path: {path:?}")]
    Malformed { path: String },

    #[error("failed to determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

impl PathError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PathError::Empty | PathError::Malformed { .. } => ErrorKind::InvalidPath,
            PathError::WorkingDir(_) => ErrorKind::Io,
        }
    }
}

/// Maps user-supplied paths to canonical absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    /// Absolute directory relative paths are anchored at
    base: PathBuf,
}

impl PathResolver {
    /// Create a resolver anchored at `base`.
    ///
    /// A relative `base` is interpreted against the process working directory.
    pub fn new(base: impl AsRef<Path>) -> Result<Self, PathError> {
        let base = base.as_ref();
        let base = if base.is_absolute() {
            base.to_path_buf()
        } else {
            env::current_dir().map_err(PathError::WorkingDir)?.join(base)
        };
        let base = canonical_or_nearest(&normalize_lexically(&base));
        Ok(Self { base })
    }

    /// Create a resolver anchored at the process working directory.
    pub fn current_dir() -> Result<Self, PathError> {
        let cwd = env::current_dir().map_err(PathError::WorkingDir)?;
        Self::new(cwd)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve `path` to its canonical absolute form.
    ///
    /// Never fails for a missing file; only empty or otherwise malformed
    /// input is rejected.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
        let path = path.as_ref();
        let raw = path.as_os_str();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if raw.to_string_lossy().contains('\0') {
            return Err(PathError::Malformed {
                path: raw.to_string_lossy().into_owned(),
            });
        }

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        };

        Ok(canonical_or_nearest(&normalize_lexically(&absolute)))
    }

    /// Path shown to users: relative to the base when inside it.
    pub fn display_path(&self, canonical: &Path) -> PathBuf {
        match canonical.strip_prefix(&self.base) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => canonical.to_path_buf(),
        }
    }
}

/// Resolve `path` against the current working directory.
pub fn resolve_path(path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    PathResolver::current_dir()?.resolve(path)
}

/// Canonicalize `absolute`, falling back to its deepest existing ancestor.
fn canonical_or_nearest(absolute: &Path) -> PathBuf {
    if let Ok(canonical) = absolute.canonicalize() {
        return canonical;
    }

    for ancestor in absolute.ancestors().skip(1) {
        let Ok(canonical) = ancestor.canonicalize() else {
            continue;
        };
        return match absolute.strip_prefix(ancestor) {
            Ok(rest) => canonical.join(rest),
            Err(_) => absolute.to_path_buf(),
        };
    }

    absolute.to_path_buf()
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a prefix
                if matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_path_rejected() {
        let resolver = PathResolver::new("/").unwrap();
        assert!(matches!(resolver.resolve(""), Err(PathError::Empty)));
    }

    #[test]
    fn test_nul_path_rejected() {
        let resolver = PathResolver::new("/").unwrap();
        let err = resolver.resolve("bad\0name").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }

    #[test]
    fn test_relative_and_absolute_agree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let resolver = PathResolver::new(temp_dir.path()).unwrap();
        let from_rel = resolver.resolve("a.txt").unwrap();
        let from_abs = resolver.resolve(&file).unwrap();
        let from_dots = resolver.resolve("./sub/../a.txt").unwrap();

        assert_eq!(from_rel, from_abs);
        assert_eq!(from_rel, from_dots);
    }

    #[test]
    fn test_missing_file_resolves_through_ancestor() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();

        let before = resolver.resolve("new/dir/file.rs").unwrap();
        fs::create_dir_all(temp_dir.path().join("new/dir")).unwrap();
        fs::write(temp_dir.path().join("new/dir/file.rs"), "").unwrap();
        let after = resolver.resolve("new/dir/file.rs").unwrap();

        assert_eq!(before, after);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_resolves_to_target() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("real.txt");
        fs::write(&target, "x").unwrap();
        let link = temp_dir.path().join("link.txt");
        symlink(&target, &link).unwrap();

        let resolver = PathResolver::new(temp_dir.path()).unwrap();
        assert_eq!(
            resolver.resolve(&link).unwrap(),
            resolver.resolve(&target).unwrap()
        );
    }

    #[test]
    fn test_display_path_relative_to_base() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resolver = PathResolver::new(temp_dir.path()).unwrap();
        let canonical = resolver.resolve("src/lib.rs").unwrap();
        assert_eq!(resolver.display_path(&canonical), PathBuf::from("src/lib.rs"));
    }

    #[test]
    #[cfg(unix)]
    fn test_normalize_does_not_escape_root() {
        assert_eq!(
            normalize_lexically(Path::new("/../../etc")),
            PathBuf::from("/etc")
        );
    }
}
