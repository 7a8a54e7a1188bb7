//! Message handling - Classification and dispatch

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{Dispatcher, Outcome, EXPORT_FAILED_REPLY};
pub use parser::{Classified, MessageParser};
