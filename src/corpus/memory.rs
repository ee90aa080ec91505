//! Full-extract accessor that filters in memory.
//!
//! Used when the store cannot push predicates down, and by tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::facets::{CancelToken, FilterState};

use super::{CorpusAccessor, Photo, Session};

#[derive(Default)]
pub struct MemoryCorpus {
    photos: RwLock<Vec<Photo>>,
    sessions: RwLock<Vec<Session>>,
    version: AtomicU64,
}

impl MemoryCorpus {
    pub fn new(sessions: Vec<Session>, photos: Vec<Photo>) -> Self {
        Self {
            photos: RwLock::new(photos),
            sessions: RwLock::new(sessions),
            version: AtomicU64::new(1),
        }
    }

    /// Remove a session and its photos.
    pub fn delete_session(&self, session_id: i64) -> EngineResult<usize> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let mut photos = self.photos.write().map_err(poisoned)?;
        sessions.retain(|s| s.id != session_id);
        let before = photos.len();
        photos.retain(|p| p.session_id != session_id);
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(before - photos.len())
    }

    pub fn photo_count(&self) -> usize {
        self.photos.read().map(|p| p.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> EngineError {
    EngineError::CorpusUnavailable("in-memory corpus lock poisoned".to_string())
}

impl CorpusAccessor for MemoryCorpus {
    fn query(&self, filter: &FilterState, cancel: &CancelToken) -> EngineResult<Vec<Photo>> {
        let photos = self.photos.read().map_err(poisoned)?;
        let mut matched = Vec::new();
        for (i, photo) in photos.iter().enumerate() {
            if i % 4096 == 0 && cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if filter.matches(photo) {
                matched.push(photo.clone());
            }
        }
        Ok(matched)
    }

    fn sessions(&self) -> EngineResult<Vec<Session>> {
        Ok(self.sessions.read().map_err(poisoned)?.clone())
    }

    fn dataset_version(&self) -> EngineResult<u64> {
        Ok(self.version.load(Ordering::SeqCst))
    }
}
