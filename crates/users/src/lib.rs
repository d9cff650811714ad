//! # Backstage Users Crate
//!
//! Participant identity for the messaging core. Two unrelated account kinds,
//! artists and producers, share chat rooms; every reference to one of them
//! carries an explicit [`ParticipantKind`] next to the numeric id.
//!
//! ## Architecture
//!
//! - **Entities**: `ParticipantKind`, `ParticipantRef`, `Participant`
//! - **Repositories**: read access to the artist and producer tables
//! - **Services**: the `IdentityResolver` seam and its SQLite implementation
//! - **Types**: errors and result aliases

pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;

pub use entities::{Participant, ParticipantKind, ParticipantRef};
pub use repositories::ParticipantRepository;
pub use services::{IdentityResolver, SqliteIdentityResolver};
pub use types::{UserError, UserResult};
