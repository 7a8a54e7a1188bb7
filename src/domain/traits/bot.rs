use async_trait::async_trait;
use std::path::PathBuf;
use crate::application::errors::BotError;

/// Outbound reply for one inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// File attachment, sent under `filename` regardless of the on-disk name
    Document {
        path: PathBuf,
        filename: String,
        caption: Option<String>,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Start the bot and begin listening for messages
    async fn start(&self) -> Result<(), BotError>;

    /// Send a text message to a chat
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError>;

    /// Upload a file to a chat
    async fn send_document(&self, chat_id: &str, path: &std::path::Path, filename: &str, caption: Option<&str>) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;

    /// Deliver a dispatcher reply with the matching primitive
    async fn send_reply(&self, chat_id: &str, reply: &Reply) -> Result<String, BotError> {
        match reply {
            Reply::Text(text) => self.send_message(chat_id, text).await,
            Reply::Document { path, filename, caption } => {
                self.send_document(chat_id, path, filename, caption.as_deref()).await
            }
        }
    }
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
