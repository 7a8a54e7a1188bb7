//! Application services - AI bridge, export, and event delivery

pub mod ai_bridge;
pub mod exporter;
pub mod message_service;

pub use ai_bridge::{AiBridge, AiExchange, AiOutcome, AI_BUSY_REPLY, AI_FAILED_REPLY};
pub use exporter::{read_snapshot, write_snapshot, ExportFile, Exporter, EXPORT_FILENAME, EXPORT_HEADER};
pub use message_service::MessageService;
