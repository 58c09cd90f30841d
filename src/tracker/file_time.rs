use crate::path::{PathError, PathResolver};
use crate::tracker::TrackError;
use chrono::{DateTime, SecondsFormat, Utc};
use filetime::FileTime;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A file modification time with sub-second precision.
///
/// Displays as RFC 3339 UTC with milliseconds, which sorts the same way the
/// stamps compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(FileTime);

impl Stamp {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Stamp(FileTime::from_last_modification_time(metadata))
    }

    pub fn file_time(&self) -> FileTime {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.0.unix_seconds(), self.0.nanoseconds())
    }
}

impl From<FileTime> for Stamp {
    fn from(time: FileTime) -> Self {
        Stamp(time)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}.{:09}", self.0.unix_seconds(), self.0.nanoseconds()),
        }
    }
}

/// Device and inode of a file; distinguishes a recreated file from an edited one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(FileIdentity {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// One tracked file in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Canonical path; the map key
    pub path: PathBuf,
    /// Modification time observed at the last read or write
    pub modified: Stamp,
    identity: Option<FileIdentity>,
}

/// Per-scope map from canonical path to last observed modification time.
///
/// All methods take `&self`; the map is guarded by a mutex so a scope can be
/// shared between threads. Comparing mtimes rather than content is cheap but
/// coarse: two writes landing inside the filesystem's timestamp granularity
/// are indistinguishable.
#[derive(Debug)]
pub struct FileTimeTracker {
    resolver: PathResolver,
    entries: Mutex<HashMap<PathBuf, TrackedFile>>,
    path_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileTimeTracker {
    /// Create a tracker resolving relative paths against the working directory.
    pub fn new() -> Result<Self, PathError> {
        Ok(Self::with_resolver(PathResolver::current_dir()?))
    }

    pub fn with_resolver(resolver: PathResolver) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
            path_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, TrackedFile>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the current modification time of `path` after a read.
    ///
    /// Returns the recorded stamp, or `None` if the file does not exist.
    pub fn mark_read(&self, path: impl AsRef<Path>) -> Result<Option<Stamp>, TrackError> {
        let canonical = self.resolver.resolve(path)?;
        Ok(self.observe(canonical, "read"))
    }

    /// Refresh tracking after a successful write.
    ///
    /// If the file vanished in the meantime its entry is dropped.
    pub fn mark_written(&self, path: impl AsRef<Path>) -> Result<Option<Stamp>, TrackError> {
        let canonical = self.resolver.resolve(path)?;
        let observed = self.observe(canonical.clone(), "written");
        if observed.is_none() && self.entries().remove(&canonical).is_some() {
            debug!(path = %canonical.display(), "file gone after write, tracking cleared");
        }
        Ok(observed)
    }

    /// Record a read using metadata taken before the content was read.
    ///
    /// A change landing between that stat and the read then shows up as a
    /// newer mtime at the next check instead of being absorbed.
    pub fn mark_read_at(
        &self,
        path: impl AsRef<Path>,
        metadata: &Metadata,
    ) -> Result<Stamp, TrackError> {
        let canonical = self.resolver.resolve(path)?;
        Ok(self.record(canonical, metadata, "read"))
    }

    fn observe(&self, canonical: PathBuf, action: &str) -> Option<Stamp> {
        match fs::metadata(&canonical) {
            Ok(metadata) => Some(self.record(canonical, &metadata, action)),
            Err(e) => {
                debug!(path = %canonical.display(), error = %e, "stat failed, not tracking");
                None
            }
        }
    }

    fn record(&self, canonical: PathBuf, metadata: &Metadata, action: &str) -> Stamp {
        let modified = Stamp::from_metadata(metadata);
        debug!(path = %canonical.display(), %modified, "marked {action}");
        self.entries().insert(
            canonical.clone(),
            TrackedFile {
                path: canonical,
                modified,
                identity: FileIdentity::of(metadata),
            },
        );
        modified
    }

    /// Check that `path` may be written by this scope.
    ///
    /// - A file that does not exist may always be written.
    /// - An existing file must have been read (or written) by this scope,
    ///   and must not have been modified or replaced since.
    ///
    /// On Unix a file whose device/inode differs from the recorded one is
    /// reported as [`TrackError::NotRead`], not `ExternallyModified`. That
    /// covers deletion followed by recreation and also saves that write a
    /// new file and rename it over the old one, since the two cannot be told
    /// apart. Either way the scope must read the file again.
    pub fn assert_not_modified(&self, path: impl AsRef<Path>) -> Result<(), TrackError> {
        let canonical = self.resolver.resolve(path)?;

        let metadata = match fs::metadata(&canonical) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.entries().remove(&canonical).is_some() {
                    debug!(path = %canonical.display(), "tracked file no longer exists, entry dropped");
                }
                return Ok(());
            }
            Err(e) => {
                if self.entries().contains_key(&canonical) {
                    // The write itself will surface the real problem
                    warn!(path = %canonical.display(), error = %e, "stat failed during staleness check");
                    return Ok(());
                }
                return Err(TrackError::NotRead { path: canonical });
            }
        };

        let mut entries = self.entries();
        let Some(entry) = entries.get(&canonical) else {
            return Err(TrackError::NotRead { path: canonical });
        };

        let identity = FileIdentity::of(&metadata);
        if entry.identity.is_some() && identity != entry.identity {
            debug!(path = %canonical.display(), "file was replaced since last read");
            entries.remove(&canonical);
            return Err(TrackError::NotRead { path: canonical });
        }

        let modified = Stamp::from_metadata(&metadata);
        if modified > entry.modified {
            return Err(TrackError::ExternallyModified {
                path: canonical,
                modified,
                last_observed: entry.modified,
            });
        }

        Ok(())
    }

    /// Stop tracking `path`. Returns whether an entry existed.
    pub fn clear(&self, path: impl AsRef<Path>) -> Result<bool, TrackError> {
        let canonical = self.resolver.resolve(path)?;
        let removed = self.entries().remove(&canonical).is_some();
        if removed {
            debug!(path = %canonical.display(), "tracking cleared");
        }
        Ok(removed)
    }

    /// Forget every tracked file.
    pub fn clear_all(&self) {
        self.entries().clear();
    }

    pub fn is_read(&self, path: impl AsRef<Path>) -> Result<bool, TrackError> {
        let canonical = self.resolver.resolve(path)?;
        Ok(self.entries().contains_key(&canonical))
    }

    pub fn last_observed(&self, path: impl AsRef<Path>) -> Result<Option<Stamp>, TrackError> {
        let canonical = self.resolver.resolve(path)?;
        Ok(self.entries().get(&canonical).map(|entry| entry.modified))
    }

    /// Snapshot of all tracked files, sorted by path.
    pub fn tracked(&self) -> Vec<TrackedFile> {
        let mut files: Vec<TrackedFile> = self.entries().values().cloned().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Lock serializing writers of one canonical path within this scope.
    ///
    /// Hold the returned mutex for the whole check-write-mark sequence.
    pub fn path_lock(&self, canonical: &Path) -> Arc<Mutex<()>> {
        let mut locks = self
            .path_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(canonical.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
