//! Domain layer - Core business objects with no infrastructure dependencies
//! 
//! This layer contains:
//! - Entities: Persisted messages, inbound events, commands
//! - Traits: Abstractions for infrastructure (Bot, MessageStore)

pub mod entities;
pub mod traits;
