use crate::replace::StrategyKind;
use crate::safety::{SafetyError, WorkspaceGuard};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct EditorConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for (field, value) in [
            (
                "matching.block_anchor_threshold",
                self.matching.block_anchor_threshold,
            ),
            ("matching.context_threshold", self.matching.context_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(ValidationIssue::ThresholdOutOfRange { field, value });
            }
        }

        if self
            .matching
            .disabled_strategies
            .contains(&StrategyKind::Exact)
        {
            issues.push(ValidationIssue::InvalidCombo {
                message: "the exact strategy cannot be disabled".to_string(),
            });
        }

        if self.workspace.enforce_boundary && self.workspace.root.is_none() {
            issues.push(ValidationIssue::MissingField {
                field: "workspace.root",
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Tuning for the matching cascade.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum mean similarity of interior lines for a block-anchor match
    pub block_anchor_threshold: f64,
    /// Minimum share of identical interior lines for a context-aware match
    pub context_threshold: f64,
    /// Strategies skipped by the cascade
    pub disabled_strategies: Vec<StrategyKind>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            block_anchor_threshold: 0.3,
            context_threshold: 0.5,
            disabled_strategies: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Reject edits outside `root`
    #[serde(default)]
    pub enforce_boundary: bool,
    /// Forbidden directories; the built-in list when absent
    #[serde(default)]
    pub forbidden: Option<Vec<PathBuf>>,
}

impl WorkspaceConfig {
    /// Build the guard this configuration asks for, if any.
    pub fn guard(&self) -> Result<Option<WorkspaceGuard>, SafetyError> {
        if !self.enforce_boundary {
            return Ok(None);
        }
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let guard = match &self.forbidden {
            Some(dirs) => WorkspaceGuard::with_forbidden(root, dirs.clone())?,
            None => WorkspaceGuard::new(root)?,
        };
        Ok(Some(guard))
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    ThresholdOutOfRange { field: &'static str, value: f64 },
    InvalidCombo { message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "config missing required field '{field}'")
            }
            ValidationIssue::ThresholdOutOfRange { field, value } => {
                write!(f, "'{field}' must be between 0 and 1 (got {value})")
            }
            ValidationIssue::InvalidCombo { message } => {
                write!(f, "invalid editor configuration: {message}")
            }
        }
    }
}
