//! Shared types for the chat system.

pub mod errors;

pub use errors::{ChatError, ChatResult, ErrorKind};

pub type RoomId = i64;
pub type MessageId = i64;
