//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;

pub use user::User;
pub use message::{InboundEvent, Message, format_timestamp, parse_timestamp, stamp_after};
pub use command::{CommandInvocation, CommandName, command_list};
