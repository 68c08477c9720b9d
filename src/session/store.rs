use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use super::aggregator::ResultAggregator;
use crate::core::{NfseError, OutcomeRecord};

/// Opaque handle returned by an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = NfseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| NfseError::Upload(format!("invalid session id '{s}': {e}")))
    }
}

/// The latest processed upload of a session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Stored (resolved) workbook.
    pub upload_path: PathBuf,
    /// File name as uploaded.
    pub file_name: String,
    pub results: ResultAggregator,
}

/// In-memory sessions. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session's upload and outcomes.
    pub fn record(
        &self,
        id: SessionId,
        upload_path: PathBuf,
        file_name: impl Into<String>,
        outcomes: Vec<OutcomeRecord>,
    ) {
        let mut sessions = self.sessions.write();
        let session = sessions.entry(id).or_default();
        session.upload_path = upload_path;
        session.file_name = file_name.into();
        session.results.reset();
        session.results.extend(outcomes);
        tracing::debug!(session = %id, rows = session.results.len(), "session updated");
    }

    /// Drop the session's previous upload and outcomes.
    ///
    /// Called when a new upload starts, so a failed upload leaves nothing
    /// to report or export.
    pub fn reset(&self, id: SessionId) {
        if self.sessions.write().remove(&id).is_some() {
            tracing::debug!(session = %id, "session reset for new upload");
        }
    }

    /// Snapshot of a session.
    pub fn get(&self, id: SessionId) -> Result<Session, NfseError> {
        self.sessions.read().get(&id).cloned().ok_or(NfseError::NoUpload)
    }

    pub fn outcomes(&self, id: SessionId) -> Result<Vec<OutcomeRecord>, NfseError> {
        self.get(id).map(|s| s.results.records().to_vec())
    }

    pub fn remove(&self, id: SessionId) -> Option<Session> {
        self.sessions.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
