//! SQLite dataset store.
//!
//! Uses `rusqlite` synchronously behind a mutex; every statement is a single
//! short write or indexed read. WAL mode is enabled so listing does not block
//! uploads.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::errors::AgentError;
use super::store::{dataset_key, validate_name, DatasetStore, DatasetSummary};
use crate::workforce::Dataset;

// ─── Database ───────────────────────────────────────────────────────────────

/// SQLite-backed [`DatasetStore`]. Survives restarts.
pub struct SqliteDatasetStore {
    conn: Mutex<Connection>,
}

impl SqliteDatasetStore {
    /// Open (or create) the dataset database at the given path.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, AgentError> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        tracing::info!(path, "dataset database opened");
        Ok(db)
    }

    /// Create all required tables if they don't exist.
    fn create_tables(&self) -> Result<(), AgentError> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS datasets (
                session_id TEXT NOT NULL,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                record_count INTEGER NOT NULL DEFAULT 0,
                stored_at TEXT NOT NULL,
                PRIMARY KEY (session_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_datasets_session
                ON datasets(session_id);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AgentError> {
        self.conn.lock().map_err(|_| AgentError::DatabaseError {
            reason: "dataset database lock poisoned".into(),
        })
    }

    fn decode(payload: String) -> Result<Arc<Dataset>, AgentError> {
        Ok(Arc::new(serde_json::from_str(&payload)?))
    }
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn put(&self, session_id: &str, dataset: Dataset) -> Result<(), AgentError> {
        let key = validate_name(&dataset)?;
        let payload = serde_json::to_string(&dataset)?;

        // REPLACE deletes and reinserts, so the newest row always has the
        // highest rowid.
        self.lock()?.execute(
            "INSERT OR REPLACE INTO datasets (session_id, name, payload, record_count, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session_id,
                key,
                payload,
                dataset.len() as i64,
                Utc::now().to_rfc3339()
            ],
        )?;

        tracing::debug!(session = %session_id, dataset = %dataset.name, "dataset persisted");
        Ok(())
    }

    async fn get(&self, session_id: &str, name: &str) -> Result<Option<Arc<Dataset>>, AgentError> {
        let payload: Option<String> = self
            .lock()?
            .query_row(
                "SELECT payload FROM datasets WHERE session_id = ?1 AND name = ?2",
                params![session_id, dataset_key(name)],
                |row| row.get(0),
            )
            .optional()?;
        payload.map(Self::decode).transpose()
    }

    async fn default_for(&self, session_id: &str) -> Result<Option<Arc<Dataset>>, AgentError> {
        let payload: Option<String> = self
            .lock()?
            .query_row(
                "SELECT payload FROM datasets WHERE session_id = ?1
                 ORDER BY rowid DESC LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        payload.map(Self::decode).transpose()
    }

    async fn list(&self, session_id: &str) -> Result<Vec<DatasetSummary>, AgentError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT json_extract(payload, '$.name'), record_count, stored_at
             FROM datasets WHERE session_id = ?1
             ORDER BY rowid DESC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (name, records, stored_at) = row?;
            let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| AgentError::DatabaseError {
                    reason: format!("bad stored_at '{stored_at}': {e}"),
                })?;
            summaries.push(DatasetSummary {
                name,
                records: records.max(0) as usize,
                stored_at,
            });
        }
        Ok(summaries)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workforce::{Field, Record};

    fn test_db() -> SqliteDatasetStore {
        SqliteDatasetStore::open(":memory:").unwrap()
    }

    fn crew(name: &str, hours: &[&str]) -> Dataset {
        Dataset {
            name: name.to_string(),
            records: hours
                .iter()
                .enumerate()
                .map(|(i, h)| Record {
                    id: format!("u{i}"),
                    full_name: Some(format!("Worker {i}")),
                    hours_worked: Some(h.to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let db = test_db();
        db.put("s1", crew("Q1 Report", &["40", "12.5"])).await.unwrap();

        let found = db.get("s1", "q1 REPORT").await.unwrap().unwrap();
        assert_eq!(found.name, "Q1 Report");
        assert_eq!(found.len(), 2);
        assert_eq!(found.records[1].id, "u1");
        assert_eq!(found.records[1].number(Field::HoursWorked), Some(12.5));
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let db = test_db();
        assert!(db.get("s1", "nothing").await.unwrap().is_none());
        assert!(db.default_for("s1").await.unwrap().is_none());
        assert!(db.list("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_and_default_ordering() {
        let db = test_db();
        db.put("s1", crew("alpha", &["1"])).await.unwrap();
        db.put("s1", crew("beta", &["2"])).await.unwrap();
        assert_eq!(db.default_for("s1").await.unwrap().unwrap().name, "beta");

        db.put("s1", crew("Alpha", &["3", "4"])).await.unwrap();
        let default = db.default_for("s1").await.unwrap().unwrap();
        assert_eq!(default.name, "Alpha");
        assert_eq!(default.len(), 2);

        let listed = db.list("s1").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta"]);
        assert_eq!(listed[0].records, 2);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let db = test_db();
        db.put("s1", crew("shared", &["1"])).await.unwrap();
        assert!(db.get("s2", "shared").await.unwrap().is_none());
        assert!(db.default_for("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_on_disk_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datasets.db");
        let path = path.to_str().unwrap();

        {
            let db = SqliteDatasetStore::open(path).unwrap();
            db.put("s1", crew("persisted", &["8"])).await.unwrap();
        }

        let db = SqliteDatasetStore::open(path).unwrap();
        assert_eq!(db.default_for("s1").await.unwrap().unwrap().name, "persisted");
    }
}
