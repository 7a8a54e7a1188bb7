//! chatlog-bot - silently logs chat messages, answers `/ai` and `/export`
//!
//! Plain messages are appended to a SQLite log without a reply. `/ai <prompt>`
//! forwards the prompt to an LLM provider and replies with the answer;
//! `/export` replies with a CSV snapshot of the log.

pub mod domain;
pub mod application;
pub mod infrastructure;
