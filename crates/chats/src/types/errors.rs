//! Error types for the chat system.

use backstage_users::{ParticipantRef, UserError};
use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Coarse classification callers map onto their own failure representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    StoreUnavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Room not found: {id}")]
    RoomNotFound { id: String },

    #[error("Message not found: {id}")]
    MessageNotFound { id: i64 },

    #[error("Participant not found: {participant}")]
    ParticipantNotFound { participant: ParticipantRef },

    #[error("Access denied: {reason}")]
    Forbidden { reason: String },

    #[error("Message must have content or an attachment")]
    EmptyMessage,

    #[error("Invalid participant: {reason}")]
    InvalidParticipant { reason: String },

    #[error("Invalid room name: {reason}")]
    InvalidRoomName { reason: String },

    #[error("Cannot mark your own message as read")]
    SelfRead,

    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ChatError {
    pub fn room_not_found(id: impl ToString) -> Self {
        Self::RoomNotFound { id: id.to_string() }
    }

    pub fn message_not_found(id: i64) -> Self {
        Self::MessageNotFound { id }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn invalid_participant(reason: impl Into<String>) -> Self {
        Self::InvalidParticipant {
            reason: reason.into(),
        }
    }

    pub fn invalid_room_name(reason: impl Into<String>) -> Self {
        Self::InvalidRoomName {
            reason: reason.into(),
        }
    }

    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::RoomNotFound { .. }
            | ChatError::MessageNotFound { .. }
            | ChatError::ParticipantNotFound { .. } => ErrorKind::NotFound,
            ChatError::Forbidden { .. } => ErrorKind::Forbidden,
            ChatError::EmptyMessage
            | ChatError::InvalidParticipant { .. }
            | ChatError::InvalidRoomName { .. }
            | ChatError::SelfRead => ErrorKind::InvalidInput,
            ChatError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            ChatError::Storage(err) if err.is_transient() => ErrorKind::StoreUnavailable,
            ChatError::Storage(StorageError::InvalidKey(_)) => ErrorKind::InvalidInput,
            ChatError::Storage(_) | ChatError::Database(_) | ChatError::Internal { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::store_unavailable(err.to_string())
            }
            sqlx::Error::Database(db) if is_busy_code(db.code().as_deref()) => {
                Self::store_unavailable(db.message().to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including their extended codes.
fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|code| code.parse::<i32>().ok())
        .map(|code| matches!(code & 0xff, 5 | 6))
        .unwrap_or(false)
}

impl From<UserError> for ChatError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound { kind, id } => Self::ParticipantNotFound {
                participant: ParticipantRef::new(kind, id),
            },
            UserError::InvalidParticipant(reason) => Self::InvalidParticipant { reason },
            UserError::DatabaseError(message) => Self::store_unavailable(message),
        }
    }
}

impl From<chrono::ParseError> for ChatError {
    fn from(err: chrono::ParseError) -> Self {
        Self::Internal {
            message: format!("stored timestamp is malformed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(ChatError::room_not_found(3).kind(), ErrorKind::NotFound);
        assert_eq!(ChatError::forbidden("nope").kind(), ErrorKind::Forbidden);
        assert_eq!(ChatError::EmptyMessage.kind(), ErrorKind::InvalidInput);
        assert_eq!(ChatError::SelfRead.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            ChatError::from(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::StoreUnavailable
        );
        assert_eq!(
            ChatError::from(sqlx::Error::RowNotFound).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn busy_codes_are_recognised() {
        assert!(is_busy_code(Some("5")));
        assert!(is_busy_code(Some("517")));
        assert!(is_busy_code(Some("6")));
        assert!(!is_busy_code(Some("19")));
        assert!(!is_busy_code(None));
    }

    #[test]
    fn invalid_participant_from_user_error() {
        let err: ChatError = UserError::invalid_participant("unknown participant kind 'x'").into();
        assert!(matches!(err, ChatError::InvalidParticipant { .. }));
    }

    #[test]
    fn identity_store_failures_are_retryable() {
        let err: ChatError = UserError::DatabaseError("database is locked".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
