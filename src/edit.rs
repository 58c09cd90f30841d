use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single find/replace instruction.
///
/// An empty `old_string` is only meaningful as the first edit of a request,
/// where it creates (or overwrites) the file with `new_string`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperation {
    /// Text to find
    pub old_string: String,
    /// Text to put in its place
    pub new_string: String,
    /// Replace every occurrence instead of requiring exactly one
    #[serde(default)]
    pub replace_all: bool,
}

impl EditOperation {
    pub fn new(old_string: impl Into<String>, new_string: impl Into<String>) -> Self {
        Self {
            old_string: old_string.into(),
            new_string: new_string.into(),
            replace_all: false,
        }
    }

    /// Set whether every occurrence is replaced.
    #[must_use]
    pub fn replace_all(mut self, replace_all: bool) -> Self {
        self.replace_all = replace_all;
        self
    }

    /// Whether this edit creates the file rather than editing it.
    pub fn is_creation(&self) -> bool {
        self.old_string.is_empty()
    }
}

/// Validation failures for an edit request. Indices are 0-based in the
/// value and 1-based in the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("file_path parameter is required")]
    MissingFilePath,

    #[error("edits parameter is required and must be an array")]
    EditsNotArray,

    #[error("edits array cannot be empty")]
    EmptyEditList,

    #[error("edit {} is not a valid object", .index + 1)]
    InvalidEdit { index: usize },

    #[error("edit {} is missing {field}", .index + 1)]
    MissingField { index: usize, field: &'static str },

    #[error("edit {} has identical old_string and new_string", .index + 1)]
    IdenticalStrings { index: usize },

    #[error("edit {} has an empty old_string; only the first edit may create a file", .index + 1)]
    EmptyOldString { index: usize },
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::MissingFilePath
            | RequestError::MissingField { .. }
            | RequestError::EmptyOldString { .. } => ErrorKind::MissingField,
            RequestError::EditsNotArray | RequestError::InvalidEdit { .. } => {
                ErrorKind::InvalidRequest
            }
            RequestError::EmptyEditList => ErrorKind::EmptyEditList,
            RequestError::IdenticalStrings { .. } => ErrorKind::IdenticalStrings,
        }
    }
}

/// An ordered list of edits against one file.
///
/// Construction validates every edit up front, so a request that exists is
/// one that can be attempted without touching the disk first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    file_path: PathBuf,
    edits: Vec<EditOperation>,
}

impl EditRequest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        edits: Vec<EditOperation>,
    ) -> Result<Self, RequestError> {
        let file_path = file_path.into();
        if file_path.as_os_str().is_empty() {
            return Err(RequestError::MissingFilePath);
        }
        validate_edits(&edits)?;
        Ok(Self { file_path, edits })
    }

    /// Parse the tool-call shape
    /// `{"file_path": "...", "edits": [{"old_string", "new_string", "replace_all"?}]}`.
    pub fn from_json(value: &Value) -> Result<Self, RequestError> {
        let file_path = value
            .get("file_path")
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .ok_or(RequestError::MissingFilePath)?;

        let raw_edits = value
            .get("edits")
            .and_then(Value::as_array)
            .ok_or(RequestError::EditsNotArray)?;

        let edits = raw_edits
            .iter()
            .enumerate()
            .map(|(index, raw)| parse_edit(index, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(file_path, edits)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn edits(&self) -> &[EditOperation] {
        &self.edits
    }

    /// Whether the first edit creates the file.
    pub fn creates_file(&self) -> bool {
        self.edits.first().is_some_and(EditOperation::is_creation)
    }
}

fn parse_edit(index: usize, raw: &Value) -> Result<EditOperation, RequestError> {
    let object = raw.as_object().ok_or(RequestError::InvalidEdit { index })?;

    let field = |name: &'static str| {
        object
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(RequestError::MissingField { index, field: name })
    };
    let old_string = field("old_string")?;
    let new_string = field("new_string")?;

    let replace_all = match object.get("replace_all") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(RequestError::InvalidEdit { index }),
    };

    Ok(EditOperation {
        old_string,
        new_string,
        replace_all,
    })
}

/// Check every edit before any is applied.
pub fn validate_edits(edits: &[EditOperation]) -> Result<(), RequestError> {
    if edits.is_empty() {
        return Err(RequestError::EmptyEditList);
    }

    for (index, edit) in edits.iter().enumerate() {
        if edit.old_string == edit.new_string {
            return Err(RequestError::IdenticalStrings { index });
        }
        if index > 0 && edit.old_string.is_empty() {
            return Err(RequestError::EmptyOldString { index });
        }
    }

    Ok(())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes. `permissions` is
/// applied to the new file; new files default to 0644 on Unix. The mtime is
/// bumped to now so the write is always observable.
pub fn atomic_write(
    path: &Path,
    content: &[u8],
    permissions: Option<fs::Permissions>,
) -> std::io::Result<()> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;

    if let Some(permissions) = permissions.or_else(default_permissions) {
        temp.as_file().set_permissions(permissions)?;
    }

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_edit_list_rejected() {
        let err = EditRequest::new("a.txt", vec![]).unwrap_err();
        assert_eq!(err, RequestError::EmptyEditList);
        assert_eq!(err.kind(), ErrorKind::EmptyEditList);
    }

    #[test]
    fn test_identical_strings_rejected_anywhere() {
        let edits = vec![
            EditOperation::new("a", "b"),
            EditOperation::new("c", "d"),
            EditOperation::new("same", "same"),
        ];
        let err = EditRequest::new("a.txt", edits).unwrap_err();
        assert_eq!(err, RequestError::IdenticalStrings { index: 2 });
        assert_eq!(
            err.to_string(),
            "edit 3 has identical old_string and new_string"
        );
    }

    #[test]
    fn test_empty_old_string_only_first() {
        assert!(EditRequest::new("a.txt", vec![EditOperation::new("", "hello")]).is_ok());

        let edits = vec![EditOperation::new("a", "b"), EditOperation::new("", "c")];
        let err = EditRequest::new("a.txt", edits).unwrap_err();
        assert_eq!(err, RequestError::EmptyOldString { index: 1 });
    }

    #[test]
    fn test_from_json() {
        let value = json!({
            "file_path": "src/lib.rs",
            "edits": [
                {"old_string": "a", "new_string": "b"},
                {"old_string": "c", "new_string": "d", "replace_all": true}
            ]
        });
        let request = EditRequest::from_json(&value).unwrap();
        assert_eq!(request.file_path(), Path::new("src/lib.rs"));
        assert_eq!(request.edits().len(), 2);
        assert!(!request.edits()[0].replace_all);
        assert!(request.edits()[1].replace_all);
    }

    #[test]
    fn test_from_json_missing_fields() {
        let value = json!({"edits": []});
        assert_eq!(
            EditRequest::from_json(&value).unwrap_err(),
            RequestError::MissingFilePath
        );

        let value = json!({"file_path": "a", "edits": "nope"});
        assert_eq!(
            EditRequest::from_json(&value).unwrap_err(),
            RequestError::EditsNotArray
        );

        let value = json!({"file_path": "a", "edits": [42]});
        assert_eq!(
            EditRequest::from_json(&value).unwrap_err(),
            RequestError::InvalidEdit { index: 0 }
        );

        let value = json!({"file_path": "a", "edits": [{"old_string": "x"}]});
        let err = EditRequest::from_json(&value).unwrap_err();
        assert_eq!(
            err,
            RequestError::MissingField {
                index: 0,
                field: "new_string"
            }
        );
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn test_deserialize_operation_defaults() {
        let op: EditOperation =
            serde_json::from_value(json!({"old_string": "a", "new_string": "b"})).unwrap();
        assert!(!op.replace_all);
    }

    #[test]
    fn test_atomic_write_integration() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, b"original content").unwrap();

        atomic_write(&file_path, b"modified content", None).unwrap();

        let new_content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(new_content, "modified content");
    }

    #[test]
    #[cfg(unix)]
    fn test_atomic_write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("script.sh");
        fs::write(&file_path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o755)).unwrap();

        let permissions = fs::metadata(&file_path).unwrap().permissions();
        atomic_write(&file_path, b"#!/bin/sh\necho hi\n", Some(permissions)).unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
