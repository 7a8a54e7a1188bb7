//! SQLite message log
//!
//! One connection behind a mutex. Every operation runs as a single statement
//! on a blocking worker, so concurrent handlers are serialized at this
//! boundary and async tasks never block on disk I/O.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::errors::StorageError;
use crate::domain::entities::{format_timestamp, parse_timestamp, stamp_after, Message};
use crate::domain::traits::MessageStore;

struct Inner {
    conn: Connection,
    /// Floor for the next timestamp; keeps stamps non-decreasing.
    last_stamp: Option<DateTime<Utc>>,
}

/// SQLite-backed [`MessageStore`]
///
/// Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<Mutex<Inner>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { conn, last_stamp: None })),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Inner) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().map_err(|_| StorageError::Poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn init(&self) -> Result<(), StorageError> {
        self.with_conn(|inner| {
            inner.conn.execute(
                "CREATE TABLE IF NOT EXISTS messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    sender TEXT NOT NULL,
                    text TEXT NOT NULL,
                    timestamp TEXT NOT NULL
                )",
                [],
            )?;

            // Timestamps are fixed-width RFC 3339, so MAX is the latest one.
            let latest: Option<String> = inner.conn.query_row(
                "SELECT MAX(timestamp) FROM messages",
                [],
                |row| row.get(0),
            )?;

            if let Some(latest) = latest {
                let stamp = parse_timestamp(&latest).map_err(|e| StorageError::Corrupt {
                    id: 0,
                    reason: format!("latest timestamp {:?}: {}", latest, e),
                })?;
                inner.last_stamp = Some(inner.last_stamp.map_or(stamp, |last| last.max(stamp)));
            }

            Ok(())
        })
        .await?;

        tracing::debug!("Message table ready");
        Ok(())
    }

    async fn append(&self, sender: &str, text: &str) -> Result<i64, StorageError> {
        let sender = sender.to_string();
        let text = text.to_string();

        self.with_conn(move |inner| {
            let stamp = stamp_after(inner.last_stamp);
            inner.conn.execute(
                "INSERT INTO messages (sender, text, timestamp) VALUES (?1, ?2, ?3)",
                params![sender, text, format_timestamp(&stamp)],
            )?;
            inner.last_stamp = Some(stamp);
            Ok(inner.conn.last_insert_rowid())
        })
        .await
    }

    async fn all(&self) -> Result<Vec<Message>, StorageError> {
        self.with_conn(|inner| {
            let mut stmt = inner.conn.prepare(
                "SELECT id, sender, text, timestamp FROM messages ORDER BY id ASC"
            )?;

            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut messages = Vec::new();
            for row in rows {
                let (id, sender, text, timestamp) = row?;
                let timestamp = parse_timestamp(&timestamp).map_err(|e| StorageError::Corrupt {
                    id,
                    reason: e.to_string(),
                })?;
                messages.push(Message::new(id, sender, text, timestamp));
            }
            Ok(messages)
        })
        .await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.with_conn(|inner| {
            let count: i64 = inner.conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}
