//! Chat history persistence
//!
//! One row per completed prompt/response exchange. Records are append-only:
//! nothing in this crate updates or deletes them.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// SQL schema for initialization
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS chats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prompt TEXT NOT NULL,
    response TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chats_created ON chats(created_at);
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One persisted prompt/response exchange.
///
/// The response is stored raw, reasoning delimiters included — sanitization
/// is a presentation concern, not a storage concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub prompt: String,
    pub response: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Append and ordered-read operations over the chat log.
///
/// A trait seam so the relay can be tested against failing or in-memory
/// stores without touching SQLite.
pub trait HistoryStore: Send + Sync {
    /// Append one exchange. Timestamps are captured here and are strictly
    /// increasing across records in append order.
    fn append(&self, prompt: &str, response: &str) -> StoreResult<ChatRecord>;

    /// All records, oldest to newest. An empty store yields an empty vec.
    fn history(&self) -> StoreResult<Vec<ChatRecord>>;
}

/// Thread-safe SQLite-backed chat store
#[derive(Clone)]
pub struct ChatStore {
    conn: Arc<Mutex<Connection>>,
}

impl ChatStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl HistoryStore for ChatStore {
    fn append(&self, prompt: &str, response: &str) -> StoreResult<ChatRecord> {
        let conn = self.conn.lock().unwrap();

        let last: Option<String> = conn
            .query_row(
                "SELECT created_at FROM chats ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        // Wall-clock capture at append time. If the clock has not advanced
        // past the previous record (sub-microsecond appends, clock skew),
        // bump just past it to keep timestamps strictly increasing.
        let mut now = Utc::now();
        if let Some(last) = last.as_deref().map(parse_datetime) {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }

        conn.execute(
            "INSERT INTO chats (prompt, response, created_at) VALUES (?1, ?2, ?3)",
            params![
                prompt,
                response,
                now.to_rfc3339_opts(SecondsFormat::Nanos, true)
            ],
        )?;

        Ok(ChatRecord {
            prompt: prompt.to_string(),
            response: response.to_string(),
            created_at: now,
        })
    }

    fn history(&self) -> StoreResult<Vec<ChatRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT prompt, response, created_at FROM chats ORDER BY created_at ASC, id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ChatRecord {
                prompt: row.get(0)?,
                response: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
