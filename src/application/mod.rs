//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: AI bridge, exporter, event delivery
//! - Errors: Typed errors for every component
//! - Messaging: Classification and dispatch

pub mod errors;
pub mod services;
pub mod messaging;
