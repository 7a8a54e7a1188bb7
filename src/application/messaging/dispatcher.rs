//! Message dispatcher - Routes each event to the store, the AI bridge, or the exporter

use std::sync::Arc;

use super::parser::{Classified, MessageParser};
use crate::application::services::{AiBridge, Exporter};
use crate::domain::entities::{command_list, CommandInvocation, CommandName, InboundEvent};
use crate::domain::traits::{MessageStore, Reply};

/// Reply sent when a snapshot could not be produced
pub const EXPORT_FAILED_REPLY: &str = "Sorry, the export failed. Please try again later.";

/// Terminal state of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stored (or nothing to do); no reply is sent
    Silent,
    /// Exactly one reply goes back to the chat
    Replied(Reply),
}

impl Outcome {
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Outcome::Replied(reply) => Some(reply),
            Outcome::Silent => None,
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Outcome::Silent)
    }
}

/// Stateless across events; share it behind an `Arc`.
pub struct Dispatcher {
    parser: MessageParser,
    store: Arc<dyn MessageStore>,
    ai: AiBridge,
    exporter: Exporter,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, store: Arc<dyn MessageStore>, ai: AiBridge, exporter: Exporter) -> Self {
        Self {
            parser: MessageParser::new(prefix),
            store,
            ai,
            exporter,
        }
    }

    /// Only accept `@mention`-suffixed commands addressed to this bot
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.parser = self.parser.with_bot_username(username);
        self
    }

    pub fn prefix(&self) -> &str {
        self.parser.prefix()
    }

    /// True for known commands, which may wait on the provider or the disk.
    /// Everything else resolves after at most one store write.
    pub fn is_command(&self, event: &InboundEvent) -> bool {
        event
            .text
            .as_deref()
            .map_or(false, |text| matches!(self.parser.classify(text), Classified::Command(_)))
    }

    /// Handle one event to its terminal state. Never fails.
    pub async fn dispatch(&self, event: &InboundEvent) -> Outcome {
        let Some(text) = event.text.as_deref() else {
            tracing::debug!(chat_id = %event.chat_id, "Ignoring event without text");
            return Outcome::Silent;
        };

        match self.parser.classify(text) {
            Classified::Plain => self.store_only(event, text).await,
            Classified::Command(invocation) => self.run_command(event, invocation).await,
            Classified::Unknown(token) => {
                tracing::debug!(chat_id = %event.chat_id, command = %token, "Unknown command");
                Outcome::Replied(Reply::text(format!(
                    "Unknown command: {}{}\n\n{}",
                    self.prefix(),
                    token,
                    command_list(self.prefix())
                )))
            }
        }
    }

    async fn store_only(&self, event: &InboundEvent, text: &str) -> Outcome {
        let sender = event.sender_label();

        // No reply is expected for plain messages, so a failure is only logged.
        match self.store.append(&sender, text).await {
            Ok(id) => tracing::debug!(id, sender = %sender, "Stored message"),
            Err(e) => tracing::error!(sender = %sender, error = %e, "Failed to store message"),
        }

        Outcome::Silent
    }

    async fn run_command(&self, event: &InboundEvent, invocation: CommandInvocation) -> Outcome {
        tracing::info!(
            chat_id = %event.chat_id,
            sender = %event.sender_label(),
            command = invocation.name.as_str(),
            "Handling command"
        );

        match invocation.name {
            CommandName::Ai => self.ask_ai(&invocation.argument).await,
            CommandName::Export => self.export().await,
        }
    }

    async fn ask_ai(&self, prompt: &str) -> Outcome {
        if prompt.is_empty() {
            return Outcome::Replied(Reply::text(format!("Usage: {}", CommandName::Ai.usage(self.prefix()))));
        }

        let exchange = self.ai.ask(prompt).await;
        Outcome::Replied(Reply::text(exchange.reply_text()))
    }

    async fn export(&self) -> Outcome {
        match self.exporter.snapshot().await {
            Ok(file) => Outcome::Replied(Reply::Document {
                path: file.path,
                filename: file.filename,
                caption: Some(format!("{} messages", file.rows)),
            }),
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                Outcome::Replied(Reply::text(EXPORT_FAILED_REPLY))
            }
        }
    }
}
