//! Participant identity services.

pub mod identity;

pub use identity::{IdentityResolver, SqliteIdentityResolver};
