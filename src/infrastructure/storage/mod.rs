//! In-memory storage implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{stamp_after, Message};
use crate::domain::traits::MessageStore;

#[derive(Default)]
struct Log {
    messages: Vec<Message>,
    last_stamp: Option<DateTime<Utc>>,
}

/// Non-durable message log for development and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    log: Arc<RwLock<Log>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn append(&self, sender: &str, text: &str) -> Result<i64, StorageError> {
        let mut log = self.log.write().await;
        let id = log.messages.last().map_or(1, |m| m.id + 1);
        let stamp = stamp_after(log.last_stamp);
        log.messages.push(Message::new(id, sender, text, stamp));
        log.last_stamp = Some(stamp);
        Ok(id)
    }

    async fn all(&self) -> Result<Vec<Message>, StorageError> {
        let log = self.log.read().await;
        Ok(log.messages.clone())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let log = self.log.read().await;
        Ok(log.messages.len() as u64)
    }
}
