//! Error types for participant identity.

use thiserror::Error;

use crate::entities::ParticipantKind;

pub type UserResult<T> = Result<T, UserError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ParticipantKind, id: i64 },

    #[error("Invalid participant: {0}")]
    InvalidParticipant(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl UserError {
    pub fn not_found(kind: ParticipantKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn invalid_participant(message: impl Into<String>) -> Self {
        Self::InvalidParticipant(message.into())
    }
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}
