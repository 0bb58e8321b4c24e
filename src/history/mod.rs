//! In-memory, append-only record of completed generations.

use crate::artifact_store::retrieval_path;
use crate::generation::GenerationRequest;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One completed generation, joined to its artifact by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub prompt: String,
    pub genre: String,
    pub mood: String,
    pub timestamp: String,
    pub url: String,
}

impl HistoryEntry {
    /// Build an entry for `request`, stamped with the current local time.
    pub fn from_request(id: String, request: &GenerationRequest) -> Self {
        let url = retrieval_path(&id);
        Self {
            id,
            prompt: request.prompt.clone(),
            genre: request.genre.clone(),
            mood: request.mood.clone(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            url,
        }
    }
}

/// Process-wide history, lost on restart.
#[derive(Debug, Default)]
pub struct HistoryLedger {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: HistoryEntry) {
        self.lock().push(entry);
    }

    /// Snapshot of all entries, oldest first.
    pub fn list_all(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are pushed whole, so a poisoned lock still guards a valid Vec.
    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
