use std::fmt;

/// Coarse classification shared by every error this crate returns.
///
/// Callers that drive an agent loop match on the kind to decide whether to
/// re-read the file and retry; the message itself is meant for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Write attempted on an existing file never read in this scope.
    NotRead,
    /// The file changed on disk after it was last read or written.
    ExternallyModified,
    /// No matching strategy located `old_string`.
    NotFound,
    /// `old_string` matched more than once without `replace_all`.
    AmbiguousMatch,
    /// `old_string` and `new_string` are equal.
    IdenticalStrings,
    /// A multi-edit request carried no edits.
    EmptyEditList,
    /// A required request field was absent or empty.
    MissingField,
    /// The request was structurally invalid.
    InvalidRequest,
    /// The path could not be interpreted.
    InvalidPath,
    /// The path lies outside the allowed workspace.
    OutsideWorkspace,
    /// The file to edit does not exist (or is not a regular file).
    FileNotFound,
    /// Underlying I/O failure.
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotRead => "not-read",
            ErrorKind::ExternallyModified => "externally-modified",
            ErrorKind::NotFound => "not-found",
            ErrorKind::AmbiguousMatch => "ambiguous-match",
            ErrorKind::IdenticalStrings => "identical-strings",
            ErrorKind::EmptyEditList => "empty-edit-list",
            ErrorKind::MissingField => "missing-field",
            ErrorKind::InvalidRequest => "invalid-request",
            ErrorKind::InvalidPath => "invalid-path",
            ErrorKind::OutsideWorkspace => "outside-workspace",
            ErrorKind::FileNotFound => "file-not-found",
            ErrorKind::Io => "io",
        }
    }

    /// Whether re-reading the file and retrying can resolve the error.
    pub fn is_stale_read(self) -> bool {
        matches!(self, ErrorKind::NotRead | ErrorKind::ExternallyModified)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
