//! Shared types for participant identity.

pub mod errors;

pub use errors::{UserError, UserResult};

pub type ParticipantId = i64;
