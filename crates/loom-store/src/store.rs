use std::sync::Mutex;

use rusqlite::Connection;
use tracing::instrument;

use crate::db::{init_db, row_to_metadata, SELECT_COLUMNS};
use crate::error::{Result, StoreError};
use crate::types::SessionMetadata;

/// Relational index over session metadata. Thread-safe
/// wrapper around a single SQLite connection — the session core itself is
/// single-threaded and cooperative, so a `Mutex` is enough;
/// no connection pool is needed.
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (creating if absent) the index file at `path` and run schema
    /// migrations.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// An in-memory store, useful for tests and for `Empty`-only sessions
    /// that never reach disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Allocate a new row and return the assigned `id`. `metadata.id` is
    /// ignored on input.
    #[instrument(skip(self, metadata), fields(fid = %metadata.fid))]
    pub fn insert(&self, metadata: &SessionMetadata) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions
             (fid, updated_at, title, model_name, agent_name, total_messages, total_tokens, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                metadata.fid,
                metadata.updated_at,
                metadata.title,
                metadata.model_name,
                metadata.agent_name,
                metadata.total_messages,
                metadata.total_tokens,
                metadata.duration_seconds,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Whole-row replace by `id`.
    #[instrument(skip(self, metadata), fields(id = metadata.id))]
    pub fn update_by_id(&self, id: i64, metadata: &SessionMetadata) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE sessions SET
                fid = ?1, updated_at = ?2, title = ?3, model_name = ?4,
                agent_name = ?5, total_messages = ?6, total_tokens = ?7,
                duration_seconds = ?8
             WHERE id = ?9",
            rusqlite::params![
                metadata.fid,
                metadata.updated_at,
                metadata.title,
                metadata.model_name,
                metadata.agent_name,
                metadata.total_messages,
                metadata.total_tokens,
                metadata.duration_seconds,
                id,
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    /// Used at startup to populate placeholders, newest first.
    #[instrument(skip(self))]
    pub fn select_all_ordered_by_updated_at_desc(&self) -> Result<Vec<SessionMetadata>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions ORDER BY updated_at DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_metadata)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub fn delete_by_id(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM sessions WHERE id = ?1", rusqlite::params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_by_id(&self, id: i64) -> Result<Option<SessionMetadata>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM sessions WHERE id = ?1");
        match conn.query_row(&sql, rusqlite::params![id], row_to_metadata) {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }
}
