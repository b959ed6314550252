//! Session dataset cache.
//!
//! Datasets are keyed by `(session, dataset name)`. Names compare
//! case-insensitively after trimming. A write replaces whatever was stored
//! under the same key, and the most recently written dataset of a session is
//! that session's default.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::AgentError;
use crate::workforce::Dataset;

/// Normalized lookup key for a dataset name.
pub fn dataset_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Listing entry for one stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub name: String,
    pub records: usize,
    pub stored_at: DateTime<Utc>,
}

/// Storage backend for uploaded datasets.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Store `dataset` for `session_id`, replacing any dataset with the same name.
    async fn put(&self, session_id: &str, dataset: Dataset) -> Result<(), AgentError>;

    /// Look up a dataset by name.
    async fn get(&self, session_id: &str, name: &str) -> Result<Option<Arc<Dataset>>, AgentError>;

    /// The session's most recently stored dataset.
    async fn default_for(&self, session_id: &str) -> Result<Option<Arc<Dataset>>, AgentError>;

    /// All datasets of a session, newest first.
    async fn list(&self, session_id: &str) -> Result<Vec<DatasetSummary>, AgentError>;
}

/// Reject datasets that could never be looked up again.
pub(crate) fn validate_name(dataset: &Dataset) -> Result<String, AgentError> {
    let key = dataset_key(&dataset.name);
    if key.is_empty() {
        return Err(AgentError::Validation {
            reason: "dataset name cannot be empty".into(),
        });
    }
    Ok(key)
}

// ─── In-memory store ────────────────────────────────────────────────────────

#[derive(Debug)]
struct StoredDataset {
    dataset: Arc<Dataset>,
    stored_at: DateTime<Utc>,
    /// Write order within the whole store.
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryInner {
    sessions: HashMap<String, HashMap<String, StoredDataset>>,
    next_seq: u64,
}

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryDatasetStore {
    inner: tokio::sync::RwLock<MemoryInner>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn put(&self, session_id: &str, dataset: Dataset) -> Result<(), AgentError> {
        let key = validate_name(&dataset)?;
        let records = dataset.len();

        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.sessions.entry(session_id.to_string()).or_default().insert(
            key,
            StoredDataset {
                dataset: Arc::new(dataset),
                stored_at: Utc::now(),
                seq,
            },
        );

        tracing::debug!(session = %session_id, records, "dataset stored in memory");
        Ok(())
    }

    async fn get(&self, session_id: &str, name: &str) -> Result<Option<Arc<Dataset>>, AgentError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(session_id)
            .and_then(|datasets| datasets.get(&dataset_key(name)))
            .map(|stored| Arc::clone(&stored.dataset)))
    }

    async fn default_for(&self, session_id: &str) -> Result<Option<Arc<Dataset>>, AgentError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(session_id)
            .and_then(|datasets| datasets.values().max_by_key(|stored| stored.seq))
            .map(|stored| Arc::clone(&stored.dataset)))
    }

    async fn list(&self, session_id: &str) -> Result<Vec<DatasetSummary>, AgentError> {
        let inner = self.inner.read().await;
        let Some(datasets) = inner.sessions.get(session_id) else {
            return Ok(Vec::new());
        };

        let mut stored: Vec<&StoredDataset> = datasets.values().collect();
        stored.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(stored
            .into_iter()
            .map(|s| DatasetSummary {
                name: s.dataset.name.clone(),
                records: s.dataset.len(),
                stored_at: s.stored_at,
            })
            .collect())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
