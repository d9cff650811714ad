//! Participant entities.

pub mod participant;

pub use participant::{Participant, ParticipantKind, ParticipantRef};
