use crate::path::{PathError, PathResolver};
use crate::tracker::FileTimeTracker;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// One [`FileTimeTracker`] per session id.
///
/// Sessions never observe each other's reads: a file read in session `a`
/// is still unread in session `b`.
#[derive(Debug)]
pub struct SessionTrackers {
    resolver: PathResolver,
    sessions: Mutex<HashMap<String, Arc<FileTimeTracker>>>,
}

impl SessionTrackers {
    pub fn new() -> Result<Self, PathError> {
        Ok(Self::with_resolver(PathResolver::current_dir()?))
    }

    pub fn with_resolver(resolver: PathResolver) -> Self {
        Self {
            resolver,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions_map(&self) -> MutexGuard<'_, HashMap<String, Arc<FileTimeTracker>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The session's tracker, created empty on first use.
    pub fn tracker(&self, session_id: &str) -> Arc<FileTimeTracker> {
        let mut sessions = self.sessions_map();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id, "creating file tracker");
                Arc::new(FileTimeTracker::with_resolver(self.resolver.clone()))
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<FileTimeTracker>> {
        self.sessions_map().get(session_id).cloned()
    }

    /// Drop a session's tracker. Handles already given out stay usable.
    pub fn remove(&self, session_id: &str) -> Option<Arc<FileTimeTracker>> {
        self.sessions_map().remove(session_id)
    }

    /// Session ids with a tracker, sorted.
    pub fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions_map().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions_map().is_empty()
    }
}
