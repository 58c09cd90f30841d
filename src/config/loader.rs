use crate::config::schema::{EditorConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Failure to produce an [`EditorConfig`].
///
/// `origin` is the file the text came from, or `None` for inline TOML.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        origin: Option<PathBuf>,
        /// Table the offending key lives in, when it can be located
        section: Option<String>,
        source: toml_edit::de::Error,
    },
    Validation {
        origin: Option<PathBuf>,
        source: ValidationError,
    },
}

fn origin_label(origin: &Option<PathBuf>) -> String {
    match origin {
        Some(path) => path.display().to_string(),
        None => "<inline>".to_string(),
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read edit-guard config {}: {source}", path.display())
            }
            ConfigError::Toml {
                origin,
                section,
                source,
            } => {
                write!(f, "edit-guard config {} is not valid", origin_label(origin))?;
                if let Some(section) = section {
                    write!(f, " in [{section}]")?;
                }
                write!(f, ": {source}")
            }
            ConfigError::Validation { origin, source } => {
                let count = source.issues.len();
                write!(
                    f,
                    "edit-guard config {} has {count} problem{}:",
                    origin_label(origin),
                    if count == 1 { "" } else { "s" }
                )?;
                for issue in &source.issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Nearest `[table]` header above byte `offset`.
fn section_at(input: &str, offset: usize) -> Option<String> {
    input
        .get(..offset)?
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('[') && line.ends_with(']'))
        .map(|header| header.trim_matches(|c| c == '[' || c == ']').trim().to_string())
}

fn parse(input: &str, origin: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let config: EditorConfig = toml_edit::de::from_str(input).map_err(|source| {
        let section = source
            .span()
            .and_then(|span| section_at(input, span.start));
        ConfigError::Toml {
            origin: origin.map(Path::to_path_buf),
            section,
            source,
        }
    })?;
    config.validate().map_err(|source| ConfigError::Validation {
        origin: origin.map(Path::to_path_buf),
        source,
    })?;
    Ok(config)
}

pub fn load_from_str(input: &str) -> Result<EditorConfig, ConfigError> {
    parse(input, None)
}

/// Load a config file; relative `workspace.root` entries are resolved
/// against the file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse(&contents, Some(path))?;

    if let (Some(root), Some(dir)) = (config.workspace.root.as_mut(), path.parent()) {
        if root.is_relative() {
            *root = dir.join(&*root);
        }
    }

    Ok(config)
}
