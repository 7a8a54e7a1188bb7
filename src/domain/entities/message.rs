use super::User;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A persisted chat message
///
/// Records are append-only: the store assigns `id` and `timestamp` on insert
/// and never changes them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: i64, sender: impl Into<String>, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: sender.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// One inbound unit of input from the messaging platform
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Where the reply goes. Not part of the persisted record.
    pub chat_id: String,
    pub sender: Option<User>,
    /// `None` for non-text updates (stickers, photos, joins).
    pub text: Option<String>,
}

impl InboundEvent {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender: None,
            text: None,
        }
    }

    pub fn from_text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(chat_id).with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_sender(mut self, user: User) -> Self {
        self.sender = Some(user);
        self
    }

    /// Sender identifier to record, empty when the platform did not report one
    pub fn sender_label(&self) -> String {
        self.sender.as_ref().map(User::display_name).unwrap_or_default()
    }
}

/// Next insert timestamp: now at microsecond precision, never earlier than `last`.
pub fn stamp_after(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

/// Canonical text form used in the database and in exports.
///
/// Fixed-width RFC 3339 in UTC, so lexical order matches chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}
