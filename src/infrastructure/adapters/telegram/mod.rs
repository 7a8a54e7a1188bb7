//! Telegram adapter

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::errors::BotError;
use crate::domain::entities::{CommandName, InboundEvent, User as ChatUser};
use crate::domain::traits::{Bot, BotInfo};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Longest text Telegram accepts in one message
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope around every Bot API response
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, BotError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Api(self.description.unwrap_or_else(|| "no result".to_string()))),
        }
    }
}

#[derive(Deserialize)]
struct MessageResult {
    message_id: i64,
}

impl Update {
    /// The inbound event this update carries, if it is a message
    pub fn to_event(&self) -> Option<InboundEvent> {
        let msg = self.message.as_ref()?;

        let mut event = InboundEvent::new(msg.chat.id.to_string());
        if let Some(from) = &msg.from {
            event = event.with_sender(ChatUser {
                id: from.id.to_string(),
                username: from.username.clone(),
                first_name: from.first_name.clone(),
                last_name: from.last_name.clone(),
            });
        }
        event.text = msg.text.clone();
        Some(event)
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Prefers to break after a newline when one falls in the second half of
/// the chunk.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + max_chars).min(chars.len());
        if end < chars.len() {
            if let Some(newline) = chars[start..end].iter().rposition(|&c| c == '\n') {
                if newline >= max_chars / 2 {
                    end = start + newline + 1;
                }
            }
        }
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }
    chunks
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "chatlog-bot".to_string(),
                username: "chatlog_bot".to_string(),
            },
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    /// The token is part of every URL, so strip it from transport errors.
    fn network_error(e: reqwest::Error) -> BotError {
        BotError::Network(e.without_url().to_string())
    }

    async fn call<T, R>(&self, method: &str, request: &T) -> Result<R, BotError>
    where
        T: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let response = self.client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(Self::network_error)?;

        let data: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.without_url().to_string()))?;

        data.into_result()
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            first_name: String,
            username: Option<String>,
        }

        let data: BotInfoResponse = self.call("getMe", &serde_json::json!({})).await?;

        self.info = BotInfo {
            id: data.id.to_string(),
            name: data.first_name,
            username: data.username.unwrap_or_default(),
        };

        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: u64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string()],
        };

        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update], current: i64) -> i64 {
        updates.iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(current)
            .max(current)
    }

    /// Register bot commands with Telegram
    pub async fn register_commands(&self) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct Command {
            command: &'static str,
            description: &'static str,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest {
            commands: Vec<Command>,
        }

        let commands = CommandName::ALL
            .iter()
            .map(|cmd| Command {
                command: cmd.as_str(),
                description: cmd.description(),
            })
            .collect();

        let _: bool = self.call("setMyCommands", &SetMyCommandsRequest { commands }).await?;

        tracing::info!("Registered bot commands with Telegram");
        Ok(())
    }

    async fn send_text_chunk(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: &'a str,
            text: &'a str,
        }

        let result: MessageResult = self.call("sendMessage", &SendMessageRequest { chat_id, text }).await?;
        Ok(result.message_id.to_string())
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting Telegram bot (token: {}...)", &self.token[..8.min(self.token.len())]);
        Ok(())
    }

    /// Sends plain text, split across several messages when too long.
    /// Returns the id of the last message sent.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        tracing::debug!("Sending to {}: {}", chat_id, text.chars().take(100).collect::<String>());

        let mut last_id = String::new();
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            last_id = self.send_text_chunk(chat_id, &chunk).await?;
        }
        Ok(last_id)
    }

    async fn send_document(&self, chat_id: &str, path: &Path, filename: &str, caption: Option<&str>) -> Result<String, BotError> {
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!("Uploading {} ({} bytes) to {}", filename, bytes.len(), chat_id);

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .map_err(Self::network_error)?;

        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self.client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::network_error)?;

        let data: ApiResponse<MessageResult> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.without_url().to_string()))?;

        Ok(data.into_result()?.message_id.to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
