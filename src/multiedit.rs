//! Sequential application of several edits to one file.
//!
//! # Atomicity
//!
//! A request is validated in full before anything is touched, but the edits
//! themselves are applied and written one at a time. If edit *n* fails,
//! edits 1..n-1 stay on disk; nothing is rolled back. The returned
//! [`MultiEditError::Edit`] says which edit failed and how many were
//! written before it.

use crate::config::{EditorConfig, MatchingConfig};
use crate::diff::{line_stats, unified_diff};
use crate::edit::{atomic_write, EditOperation, EditRequest, RequestError};
use crate::error::ErrorKind;
use crate::path::PathError;
use crate::replace::{ReplaceError, StrategyKind, TextReplacer};
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::tracker::{FileTimeTracker, TrackError};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MultiEditError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error(transparent)]
    Path(#[from] PathError),

    /// `index` is 1-based; `applied` edits were already written.
    #[error("edit {index} failed: {source}")]
    Edit {
        index: usize,
        applied: usize,
        source: EditStepError,
    },
}

impl MultiEditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MultiEditError::Request(e) => e.kind(),
            MultiEditError::Safety(e) => e.kind(),
            MultiEditError::Path(e) => e.kind(),
            MultiEditError::Edit { source, .. } => source.kind(),
        }
    }
}

/// Failure of a single edit within a request.
#[derive(Error, Debug)]
pub enum EditStepError {
    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Replace(#[from] ReplaceError),

    #[error("file {} not found", path.display())]
    FileNotFound { path: PathBuf },

    #[error("path {} is a directory, not a file", path.display())]
    IsDirectory { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EditStepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EditStepError::Track(e) => e.kind(),
            EditStepError::Replace(e) => e.kind(),
            EditStepError::FileNotFound { .. } | EditStepError::IsDirectory { .. } => {
                ErrorKind::FileNotFound
            }
            EditStepError::Io { .. } => ErrorKind::Io,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        EditStepError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What one edit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// 1-based position in the request
    pub index: usize,
    /// Strategy that located `old_string`; `None` for a creation edit
    pub strategy: Option<StrategyKind>,
    /// Whether this edit created the file
    pub created: bool,
    pub replacements: usize,
    /// Unified diff of this edit alone
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct MultiEditResult {
    /// Canonical path of the edited file
    pub path: PathBuf,
    /// Path relative to the tracker's base directory, for messages
    pub display_path: PathBuf,
    pub outcomes: Vec<EditOutcome>,
    /// Final file content
    pub content: String,
}

impl MultiEditResult {
    /// Whether the first edit created the file.
    pub fn created(&self) -> bool {
        self.outcomes.first().is_some_and(|outcome| outcome.created)
    }

    /// Diffs of all edits, concatenated in order.
    pub fn combined_diff(&self) -> String {
        self.outcomes
            .iter()
            .map(|outcome| outcome.diff.as_str())
            .collect()
    }
}

/// Applies an [`EditRequest`] under a [`FileTimeTracker`].
#[derive(Debug, Clone, Default)]
pub struct MultiEditor {
    replacer: TextReplacer,
    guard: Option<WorkspaceGuard>,
}

/// Content being edited, carried from one edit to the next.
struct Working {
    content: Option<String>,
    permissions: Option<fs::Permissions>,
}

impl MultiEditor {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            replacer: TextReplacer::new(config),
            guard: None,
        }
    }

    /// Build an editor from a loaded config, including its workspace guard.
    pub fn from_config(config: &EditorConfig) -> Result<Self, SafetyError> {
        let editor = Self::new(config.matching.clone());
        Ok(match config.workspace.guard()? {
            Some(guard) => editor.with_guard(guard),
            None => editor,
        })
    }

    /// Reject paths outside the guard's workspace.
    #[must_use]
    pub fn with_guard(mut self, guard: WorkspaceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn replacer(&self) -> &TextReplacer {
        &self.replacer
    }

    pub fn guard(&self) -> Option<&WorkspaceGuard> {
        self.guard.as_ref()
    }

    /// Apply every edit in order, writing after each one.
    pub fn apply(
        &self,
        tracker: &FileTimeTracker,
        request: &EditRequest,
    ) -> Result<MultiEditResult, MultiEditError> {
        self.run(tracker, request, true)
    }

    /// Parse a tool-call payload and apply it.
    pub fn apply_json(
        &self,
        tracker: &FileTimeTracker,
        payload: &Value,
    ) -> Result<MultiEditResult, MultiEditError> {
        let request = EditRequest::from_json(payload)?;
        self.apply(tracker, &request)
    }

    /// Run the same checks and replacements as [`apply`](Self::apply)
    /// without writing anything or touching the tracker's entries.
    pub fn dry_run(
        &self,
        tracker: &FileTimeTracker,
        request: &EditRequest,
    ) -> Result<MultiEditResult, MultiEditError> {
        self.run(tracker, request, false)
    }

    fn resolve(&self, tracker: &FileTimeTracker, path: &Path) -> Result<PathBuf, MultiEditError> {
        let canonical = tracker.resolver().resolve(path)?;
        match &self.guard {
            Some(guard) => Ok(guard.validate_path(&canonical)?),
            None => Ok(canonical),
        }
    }

    fn run(
        &self,
        tracker: &FileTimeTracker,
        request: &EditRequest,
        commit: bool,
    ) -> Result<MultiEditResult, MultiEditError> {
        let canonical = self.resolve(tracker, request.file_path())?;
        let display_path = tracker.resolver().display_path(&canonical);

        let lock = tracker.path_lock(&canonical);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut working = Working {
            content: None,
            permissions: None,
        };
        let mut outcomes = Vec::with_capacity(request.edits().len());

        for (index, edit) in request.edits().iter().enumerate() {
            let outcome = self
                .step(tracker, &canonical, &display_path, index, edit, &mut working, commit)
                .map_err(|source| MultiEditError::Edit {
                    index: index + 1,
                    applied: if commit { outcomes.len() } else { 0 },
                    source,
                })?;
            outcomes.push(outcome);
        }

        if commit {
            info!(
                path = %display_path.display(),
                edits = outcomes.len(),
                "multi-edit applied"
            );
        }

        Ok(MultiEditResult {
            path: canonical,
            display_path,
            outcomes,
            content: working.content.unwrap_or_default(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &self,
        tracker: &FileTimeTracker,
        canonical: &Path,
        display_path: &Path,
        index: usize,
        edit: &EditOperation,
        working: &mut Working,
        commit: bool,
    ) -> Result<EditOutcome, EditStepError> {
        // Dry runs never write, so later checks would repeat the first.
        if commit || index == 0 {
            tracker.assert_not_modified(canonical)?;
        }

        let (before, after, strategy, created, replacements) = match working.content.take() {
            Some(before) => {
                let replacement = self.replacer.replace(&before, edit)?;
                (
                    before,
                    replacement.content,
                    Some(replacement.strategy),
                    false,
                    replacement.replacements,
                )
            }
            None => {
                let existing = load(canonical)?;
                if edit.is_creation() {
                    let created = existing.is_none();
                    let before = match existing {
                        Some((content, permissions)) => {
                            working.permissions = Some(permissions);
                            content
                        }
                        None => String::new(),
                    };
                    (before, edit.new_string.clone(), None, created, 1)
                } else {
                    let Some((before, permissions)) = existing else {
                        return Err(EditStepError::FileNotFound {
                            path: canonical.to_path_buf(),
                        });
                    };
                    working.permissions = Some(permissions);
                    let replacement = self.replacer.replace(&before, edit)?;
                    (
                        before,
                        replacement.content,
                        Some(replacement.strategy),
                        false,
                        replacement.replacements,
                    )
                }
            }
        };

        if commit {
            if created {
                if let Some(parent) = canonical.parent() {
                    fs::create_dir_all(parent).map_err(|e| EditStepError::io(parent, e))?;
                }
            }
            atomic_write(canonical, after.as_bytes(), working.permissions.clone())
                .map_err(|e| EditStepError::io(canonical, e))?;
            tracker.mark_written(canonical)?;

            if created {
                info!(path = %display_path.display(), bytes = after.len(), "created file");
            } else {
                let (added, removed) = line_stats(&before, &after);
                debug!(
                    path = %display_path.display(),
                    edit = index + 1,
                    replacements,
                    added,
                    removed,
                    "edit written"
                );
            }
        }

        let diff = unified_diff(display_path, &before, &after);
        working.content = Some(after);

        Ok(EditOutcome {
            index: index + 1,
            strategy,
            created,
            replacements,
            diff,
        })
    }
}

/// Current content and permissions of `path`, or `None` if it does not exist.
fn load(path: &Path) -> Result<Option<(String, fs::Permissions)>, EditStepError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EditStepError::io(path, e)),
    };
    if metadata.is_dir() {
        return Err(EditStepError::IsDirectory {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| EditStepError::io(path, e))?;
    Ok(Some((content, metadata.permissions())))
}
