//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite message log
//! - Storage: In-memory message log
//! - LLM: AI providers
//! - Adapters: Platform integrations (Telegram, console)

pub mod config;
pub mod database;
pub mod storage;
pub mod llm;
pub mod adapters;
