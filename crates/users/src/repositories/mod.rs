//! Data access for participant accounts.

pub mod participant_repository;

pub use participant_repository::ParticipantRepository;
