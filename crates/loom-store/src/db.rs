use rusqlite::Connection;

use crate::error::Result;
use crate::types::SessionMetadata;

/// Initialise the sessions table and its index. Safe to call on every
/// startup — uses `IF NOT EXISTS` throughout.
///
/// `journal_mode=WAL` makes each statement's write atomic at the file
/// level, so a crash mid-write loses at most the in-flight statement
///.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            fid              TEXT NOT NULL UNIQUE,
            updated_at       INTEGER NOT NULL,
            title            TEXT NOT NULL DEFAULT '',
            model_name       TEXT NOT NULL DEFAULT '',
            agent_name       TEXT NOT NULL DEFAULT 'just-ask',
            total_messages   INTEGER NOT NULL DEFAULT 0,
            total_tokens     INTEGER NOT NULL DEFAULT 0,
            duration_seconds INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
            ON sessions(updated_at DESC);",
    )?;
    Ok(())
}

/// Map a SQLite row to a [`SessionMetadata`], tolerating additive
/// column evolution.
pub fn row_to_metadata(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionMetadata> {
    Ok(SessionMetadata {
        id: row.get(0)?,
        fid: row.get(1)?,
        updated_at: row.get(2)?,
        title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        model_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        agent_name: row
            .get::<_, Option<String>>(5)?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(crate::types::default_agent_name),
        total_messages: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        total_tokens: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        duration_seconds: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
    })
}

pub const SELECT_COLUMNS: &str =
    "id, fid, updated_at, title, model_name, agent_name, total_messages, total_tokens, duration_seconds";
