//! Data access layer.
//!
//! Reads go through the pool held by each repository. Statements that must
//! run inside a caller's transaction are associated functions generic over
//! the executor, so they accept `&mut *tx` as well as `&pool`.

pub mod message_repository;
pub mod read_status_repository;
pub mod room_repository;

pub use message_repository::{MessageRepository, NewMessage};
pub use read_status_repository::ReadStatusRepository;
pub use room_repository::RoomRepository;

use backstage_users::ParticipantRef;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::types::ChatResult;

pub(crate) fn participant_from_row(
    row: &SqliteRow,
    kind_column: &str,
    id_column: &str,
) -> ChatResult<ParticipantRef> {
    let kind: String = row.try_get(kind_column)?;
    let id: i64 = row.try_get(id_column)?;
    Ok(ParticipantRef::from_parts(&kind, id)?)
}
