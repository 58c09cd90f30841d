//! Edit Guard: read-before-write file editing for coding agents
//!
//! An agent may only overwrite a file it has read, and only while the file
//! is unchanged since that read. Edits are find/replace operations resolved
//! through a cascade of increasingly tolerant matchers, so a model that
//! gets indentation or escaping slightly wrong still lands on the text it
//! meant.
//!
//! # Architecture
//!
//! - [`path`] turns any spelling of a path into one canonical key.
//! - [`tracker`] records the modification time each isolation scope last
//!   observed, and rejects stale writes.
//! - [`replace`] applies a single edit to in-memory content.
//! - [`multiedit`] applies an ordered list of edits to one file, checking
//!   the tracker and writing atomically after each.
//! - [`files`] provides tracked whole-file read, write and delete.
//!
//! # Safety
//!
//! - Writes to existing files require a prior read in the same scope
//! - Atomic file writes (tempfile + fsync + rename)
//! - Optional workspace boundary enforcement
//! - Ambiguous matches are refused unless `replace_all` is set
//!
//! # Example
//!
//! ```no_run
//! use edit_guard::{files, EditOperation, EditRequest, FileTimeTracker, MultiEditor};
//!
//! let tracker = FileTimeTracker::new()?;
//! let source = files::read_file(&tracker, "src/main.rs")?;
//! println!("{} bytes", source.len());
//!
//! let request = EditRequest::new(
//!     "src/main.rs",
//!     vec![EditOperation::new("HELLO", "hello")],
//! )?;
//!
//! match MultiEditor::default().apply(&tracker, &request) {
//!     Ok(result) => print!("{}", result.combined_diff()),
//!     Err(e) if e.kind().is_stale_read() => eprintln!("re-read first: {e}"),
//!     Err(e) => eprintln!("Edit failed: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod diff;
pub mod edit;
pub mod error;
pub mod files;
pub mod multiedit;
pub mod path;
pub mod replace;
pub mod safety;
pub mod tracker;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, EditorConfig, MatchingConfig};
pub use edit::{atomic_write, EditOperation, EditRequest, RequestError};
pub use error::ErrorKind;
pub use files::{delete_file, read_file, write_file, FileError, WriteOutcome};
pub use multiedit::{EditOutcome, EditStepError, MultiEditError, MultiEditResult, MultiEditor};
pub use path::{resolve_path, PathError, PathResolver};
pub use replace::{ReplaceError, Replacement, StrategyKind, TextReplacer};
pub use safety::{SafetyError, WorkspaceGuard};
pub use tracker::{FileTimeTracker, SessionTrackers, Stamp, TrackError, TrackedFile};
