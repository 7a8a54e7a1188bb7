//! Message parser - Classifies raw text as a plain message or a command

use crate::domain::entities::{CommandInvocation, CommandName};

/// What an inbound text is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Ordinary chat text, stored and not answered
    Plain,
    /// A registered command
    Command(CommandInvocation),
    /// Command-shaped, but the token is not registered
    Unknown(String),
}

/// Parses incoming text using the command marker
///
/// A command is the marker immediately followed by a token, e.g. `/ai`.
/// The token may carry an `@botname` suffix as in group chats. A marker
/// followed by whitespace or nothing is plain text.
pub struct MessageParser {
    command_prefix: String,
    bot_username: Option<String>,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            bot_username: None,
        }
    }

    /// Commands addressed to a different bot (`/ai@other_bot`) become plain text
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn classify(&self, text: &str) -> Classified {
        if self.command_prefix.is_empty() {
            return Classified::Plain;
        }

        let Some(rest) = text.strip_prefix(self.command_prefix.as_str()) else {
            return Classified::Plain;
        };

        let token_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (token, argument) = rest.split_at(token_end);
        if token.is_empty() {
            return Classified::Plain;
        }

        let (name, mention) = match token.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (token, None),
        };

        if let (Some(mention), Some(ours)) = (mention, self.bot_username.as_deref()) {
            if !mention.eq_ignore_ascii_case(ours) {
                return Classified::Plain;
            }
        }

        match CommandName::from_token(name) {
            Some(command) => Classified::Command(CommandInvocation::new(command, argument.trim())),
            None => Classified::Unknown(name.to_string()),
        }
    }
}
