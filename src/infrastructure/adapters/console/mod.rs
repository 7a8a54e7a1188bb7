//! Console adapter for development/testing

use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::errors::BotError;
use crate::domain::entities::{InboundEvent, User};
use crate::domain::traits::{Bot, BotInfo};

/// Chat id used for every console event
pub const CONSOLE_CHAT_ID: &str = "console";

/// Console bot adapter for local development
///
/// Each stdin line is one event from the `console` user; replies are printed.
pub struct ConsoleAdapter {
    info: BotInfo,
    user: User,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "chatlog-bot".to_string(),
                username: "console".to_string(),
            },
            user: User::new("0").with_username("console"),
        }
    }

    pub fn event(&self, line: impl Into<String>) -> InboundEvent {
        InboundEvent::from_text(CONSOLE_CHAT_ID, line).with_sender(self.user.clone())
    }

    /// Stream stdin lines as events until EOF
    pub fn lines(&self) -> tokio::io::Lines<BufReader<tokio::io::Stdin>> {
        BufReader::new(tokio::io::stdin()).lines()
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(())
    }

    async fn send_message(&self, _chat_id: &str, text: &str) -> Result<String, BotError> {
        println!("[BOT] {}", text);
        Ok("console_msg".to_string())
    }

    async fn send_document(&self, _chat_id: &str, path: &Path, filename: &str, caption: Option<&str>) -> Result<String, BotError> {
        let size = tokio::fs::metadata(path).await?.len();
        println!("[BOT] <file {} ({} bytes) at {}>", filename, size, path.display());
        if let Some(caption) = caption {
            println!("[BOT] {}", caption);
        }
        Ok("console_doc".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
