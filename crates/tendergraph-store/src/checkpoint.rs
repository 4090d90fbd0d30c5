//! Durable per-collection sync checkpoints.
//!
//! One SQLite row per collection. Commits happen strictly after the graph
//! store acknowledged the batch, and the sync engine serializes batches per
//! collection, so positions advance in commit order. A crash between graph
//! ack and checkpoint write replays at most one batch; harmless, since graph
//! merges are idempotent.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    InProgress,
    Completed,
    Failed,
}

impl CheckpointStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckpointStatus::InProgress => "in_progress",
            CheckpointStatus::Completed => "completed",
            CheckpointStatus::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "completed" => CheckpointStatus::Completed,
            "failed" => CheckpointStatus::Failed,
            _ => CheckpointStatus::InProgress,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub collection: String,
    /// Id of the last document in the last fully committed batch. None when
    /// the collection was registered but no batch has committed yet.
    pub position: Option<String>,
    pub status: CheckpointStatus,
    pub updated_at: String,
}

/// SQLite-backed checkpoint store. The single source of truth for resumption,
/// readable independently of graph-store state.
pub struct CheckpointTracker {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS checkpoints (
    collection TEXT PRIMARY KEY,
    position   TEXT,
    status     TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

impl CheckpointTracker {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Non-durable tracker for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, collection: &str) -> Result<Option<Checkpoint>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let checkpoint = conn
            .query_row(
                "SELECT collection, position, status, updated_at
                 FROM checkpoints WHERE collection = ?1",
                params![collection],
                |row| {
                    Ok(Checkpoint {
                        collection: row.get(0)?,
                        position: row.get(1)?,
                        status: CheckpointStatus::parse(&row.get::<_, String>(2)?),
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(checkpoint)
    }

    pub fn all(&self) -> Result<Vec<Checkpoint>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT collection, position, status, updated_at
             FROM checkpoints ORDER BY collection",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Checkpoint {
                collection: row.get(0)?,
                position: row.get(1)?,
                status: CheckpointStatus::parse(&row.get::<_, String>(2)?),
                updated_at: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Advance the checkpoint after a durably acknowledged batch write.
    ///
    /// The position is stored verbatim. No ordering check happens here: the
    /// document store's id collation (ICU in CouchDB) differs from SQLite's
    /// byte-wise BINARY, so any SQL comparison would wrongly reject
    /// legitimate positions for mixed-case ids. Commit order is the caller's
    /// contract.
    pub fn commit(&self, collection: &str, position: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO checkpoints (collection, position, status, updated_at)
             VALUES (?1, ?2, 'in_progress', ?3)
             ON CONFLICT(collection) DO UPDATE SET
                 position = excluded.position,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![collection, position, Utc::now().to_rfc3339()],
        )?;
        debug!(collection, position, "Checkpoint committed");
        Ok(())
    }

    pub fn set_status(&self, collection: &str, status: CheckpointStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO checkpoints (collection, position, status, updated_at)
             VALUES (?1, NULL, ?2, ?3)
             ON CONFLICT(collection) DO UPDATE SET
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![collection, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Drop the stored position for a full resync.
    pub fn reset(&self, collection: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM checkpoints WHERE collection = ?1",
            params![collection],
        )?;
        Ok(())
    }
}
