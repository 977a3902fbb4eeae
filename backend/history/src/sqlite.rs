/// SQLite-backed durable history store.
///
/// Uses `rusqlite` to persist one row per processed screenshot in a
/// `history` table. The connection sits behind a `tokio::sync::Mutex`, so
/// writes are serialized; the insert has committed before `append`
/// returns, there is no background write-back.
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use rusqlite::{Connection, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use screensage_core::{NewScreenshot, SageError, ScreenshotRecord};

use crate::store::HistoryStore;

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn =
            Connection::open(path.as_ref()).context("Failed to open history database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL")?;
        init_schema(&conn)?;
        info!("history store opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS history (
             id         INTEGER PRIMARY KEY AUTOINCREMENT,
             timestamp  INTEGER NOT NULL,
             image_path TEXT NOT NULL,
             thumbnail  TEXT NOT NULL,
             text       TEXT NOT NULL,
             answer     TEXT NOT NULL,
             title      TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp);",
    )
    .context("Failed to initialize history schema")?;

    // Databases created before the title column existed must still open;
    // their rows read back with an absent title.
    if !has_column(conn, "history", "title")? {
        conn.execute_batch("ALTER TABLE history ADD COLUMN title TEXT;")
            .context("Failed to add title column to history table")?;
        info!("added title column to history table");
    }
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    Ok(names.any(|name| matches!(name.as_deref(), Ok(c) if c == column)))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, record: NewScreenshot) -> Result<i64, SageError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO history (timestamp, image_path, thumbnail, text, answer, title)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.timestamp.timestamp_micros(),
                record.image_path,
                record.thumbnail,
                record.text,
                record.answer,
                record.title,
            ],
        )
        .map_err(|e| SageError::Persistence(e.to_string()))?;
        let id = conn.last_insert_rowid();
        debug!(id, "history record appended");
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScreenshotRecord>, SageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, image_path, thumbnail, text, answer, title
                 FROM history ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )
            .map_err(|e| SageError::Persistence(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_record)
            .map_err(|e| SageError::Persistence(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| SageError::Persistence(e.to_string()))?);
        }
        Ok(records)
    }

    async fn by_id(&self, id: i64) -> Result<ScreenshotRecord, SageError> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT id, timestamp, image_path, thumbnail, text, answer, title
             FROM history WHERE id = ?1",
            params![id],
            row_to_record,
        );
        match result {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(SageError::NotFound(id)),
            Err(e) => Err(SageError::Persistence(e.to_string())),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), SageError> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute("DELETE FROM history WHERE id = ?1", params![id])
            .map_err(|e| SageError::Persistence(e.to_string()))?;
        if affected == 0 {
            return Err(SageError::NotFound(id));
        }
        debug!(id, "history record deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row deserialization helper
// ---------------------------------------------------------------------------

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ScreenshotRecord> {
    let micros: i64 = row.get(1)?;
    let timestamp = DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, micros))?;
    Ok(ScreenshotRecord {
        id: row.get(0)?,
        timestamp,
        image_path: row.get(2)?,
        thumbnail: row.get(3)?,
        text: row.get(4)?,
        answer: row.get(5)?,
        title: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn draft(text: &str, at_offset_secs: i64) -> NewScreenshot {
        NewScreenshot {
            timestamp: Utc::now() + Duration::seconds(at_offset_secs),
            image_path: String::new(),
            thumbnail: "data:image/png;base64,AAAA".to_string(),
            text: text.to_string(),
            answer: "answer".to_string(),
            title: Some("title".to_string()),
        }
    }

    #[tokio::test]
    async fn test_append_and_fetch_round_trip() {
        let store = SqliteHistoryStore::in_memory().expect("in-memory db");
        let record = draft("hello", 0);
        let id = store.append(record.clone()).await.unwrap();

        let fetched = store.by_id(id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.text, "hello");
        assert_eq!(fetched.answer, "answer");
        assert_eq!(fetched.title.as_deref(), Some("title"));
        assert_eq!(
            fetched.timestamp.timestamp_micros(),
            record.timestamp.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_recent_orders_by_timestamp_then_id() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.append(draft("old", -60)).await.unwrap();
        let shared = Utc::now();
        let mut tied = draft("tied-a", 0);
        tied.timestamp = shared;
        let tied_a = store.append(tied.clone()).await.unwrap();
        tied.text = "tied-b".to_string();
        let tied_b = store.append(tied).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, tied_b);
        assert_eq!(recent[1].id, tied_a);
        assert_eq!(recent[2].text, "old");

        let bounded = store.recent(1).await.unwrap();
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].id, tied_b);
    }

    #[tokio::test]
    async fn test_delete_and_not_found() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        let id = store.append(draft("gone", 0)).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.by_id(id).await.unwrap_err().is_not_found());
        assert!(store.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let store = SqliteHistoryStore::open(&path).unwrap();
            store.append(draft("durable", 0)).await.unwrap();
        }
        let store = SqliteHistoryStore::open(&path).unwrap();
        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].text, "durable");
    }

    #[tokio::test]
    async fn test_opens_database_created_without_title_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE history (
                     id         INTEGER PRIMARY KEY AUTOINCREMENT,
                     timestamp  INTEGER NOT NULL,
                     image_path TEXT NOT NULL,
                     thumbnail  TEXT NOT NULL,
                     text       TEXT NOT NULL,
                     answer     TEXT NOT NULL
                 );",
            )
            .unwrap();
            conn.execute(
                "INSERT INTO history (timestamp, image_path, thumbnail, text, answer)
                 VALUES (?1, '', '', 'legacy', 'row')",
                params![Utc::now().timestamp_micros()],
            )
            .unwrap();
        }

        let store = SqliteHistoryStore::open(&path).unwrap();
        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].text, "legacy");
        assert_eq!(recent[0].title, None);

        // New rows can carry a title in the migrated table.
        let id = store.append(draft("fresh", 1)).await.unwrap();
        assert_eq!(store.by_id(id).await.unwrap().title.as_deref(), Some("title"));
    }
}
