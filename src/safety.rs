use crate::error::ErrorKind;
use crate::path::{PathError, PathResolver};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Workspace safety checks to prevent editing files outside the target workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Resolver anchored at the canonical workspace root
    resolver: PathResolver,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("file {path} is not in the workspace {workspace}")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Invalid path: {0}")]
    Path(#[from] PathError),
}

impl SafetyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SafetyError::OutsideWorkspace { .. } | SafetyError::ForbiddenPath { .. } => {
                ErrorKind::OutsideWorkspace
            }
            SafetyError::Path(e) => e.kind(),
        }
    }
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// Toolchain and registry directories under the home directory, and the
    /// workspace's own `target/`, are forbidden by default.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let resolver = PathResolver::new(workspace_root)?;

        let mut forbidden_paths = Vec::new();
        if let Some(home) = home::home_dir() {
            for dir in [".cargo/registry", ".cargo/git", ".rustup"] {
                if let Ok(path) = home.join(dir).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }
        if let Ok(target_dir) = resolver.base().join("target").canonicalize() {
            forbidden_paths.push(target_dir);
        }

        Ok(Self {
            resolver,
            forbidden_paths,
        })
    }

    /// Create a guard with an explicit forbidden list.
    ///
    /// Relative entries are interpreted against the workspace root.
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let resolver = PathResolver::new(workspace_root)?;
        let forbidden_paths = forbidden
            .into_iter()
            .map(|dir| resolver.resolve(dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            resolver,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to edit.
    ///
    /// Returns the canonical absolute path if safe. The file does not need to
    /// exist, so creation targets are validated the same way as edits.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = self.resolver.resolve(path)?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(self.resolver.base()) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.resolver.base().to_path_buf(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        self.resolver.base()
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }
}
