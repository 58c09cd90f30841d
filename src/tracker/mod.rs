//! Read-before-write tracking.
//!
//! A [`FileTimeTracker`] is one isolation scope: it remembers the
//! modification time each file had when this scope last read or wrote it,
//! and refuses writes to files that changed underneath it. Scopes are plain
//! values; [`SessionTrackers`] hands out one per session id.

mod errors;
mod file_time;
mod registry;

pub use errors::TrackError;
pub use file_time::{FileTimeTracker, Stamp, TrackedFile};
pub use registry::SessionTrackers;
