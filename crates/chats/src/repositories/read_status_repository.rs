//! Repository for per-recipient read statuses.

use backstage_users::ParticipantRef;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use super::participant_from_row;
use crate::entities::ReadStatus;
use crate::types::ChatResult;
use crate::utils::time::{format_timestamp, parse_timestamp};

#[derive(Clone)]
pub struct ReadStatusRepository {
    pool: SqlitePool,
}

impl ReadStatusRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One unread row for every current room participant except the sender.
    pub async fn insert_unread_for_recipients<'e, E>(
        executor: E,
        message_id: i64,
        room_id: i64,
        sender: ParticipantRef,
    ) -> ChatResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO message_read_statuses (message_id, reader_kind, reader_id, is_read, read_at)
             SELECT ?, participant_kind, participant_id, 0, NULL
             FROM chat_room_participants
             WHERE chat_room_id = ? AND NOT (participant_kind = ? AND participant_id = ?)",
        )
        .bind(message_id)
        .bind(room_id)
        .bind(sender.kind.as_str())
        .bind(sender.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Flip an unread row to read. Returns `false` when there was no unread row.
    pub async fn mark_read<'e, E>(
        executor: E,
        message_id: i64,
        reader: ParticipantRef,
        read_at: DateTime<Utc>,
    ) -> ChatResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE message_read_statuses SET is_read = 1, read_at = ?
             WHERE message_id = ? AND reader_kind = ? AND reader_id = ? AND is_read = 0",
        )
        .bind(format_timestamp(read_at))
        .bind(message_id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a read row where none exists. Returns `false` when a row was already there.
    pub async fn insert_read<'e, E>(
        executor: E,
        message_id: i64,
        reader: ParticipantRef,
        read_at: DateTime<Utc>,
    ) -> ChatResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO message_read_statuses (message_id, reader_kind, reader_id, is_read, read_at)
             VALUES (?, ?, ?, 1, ?)
             ON CONFLICT(message_id, reader_kind, reader_id) DO NOTHING",
        )
        .bind(message_id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .bind(format_timestamp(read_at))
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip every unread row of `reader` in the room. Returns the number flipped.
    pub async fn mark_room_read<'e, E>(
        executor: E,
        room_id: i64,
        reader: ParticipantRef,
        read_at: DateTime<Utc>,
    ) -> ChatResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE message_read_statuses SET is_read = 1, read_at = ?
             WHERE reader_kind = ? AND reader_id = ? AND is_read = 0
               AND message_id IN (SELECT id FROM messages WHERE room_id = ?)",
        )
        .bind(format_timestamp(read_at))
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .bind(room_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Read rows for room messages from others that `reader` has no row for.
    pub async fn backfill_room_read<'e, E>(
        executor: E,
        room_id: i64,
        reader: ParticipantRef,
        read_at: DateTime<Utc>,
    ) -> ChatResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO message_read_statuses (message_id, reader_kind, reader_id, is_read, read_at)
             SELECT m.id, ?, ?, 1, ? FROM messages m
             WHERE m.room_id = ?
               AND NOT (m.sender_kind = ? AND m.sender_id = ?)
               AND NOT EXISTS (
                   SELECT 1 FROM message_read_statuses s
                   WHERE s.message_id = m.id AND s.reader_kind = ? AND s.reader_id = ?)
             ON CONFLICT(message_id, reader_kind, reader_id) DO NOTHING",
        )
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .bind(format_timestamp(read_at))
        .bind(room_id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find(&self, message_id: i64, reader: ParticipantRef) -> ChatResult<Option<ReadStatus>> {
        let row = sqlx::query(
            "SELECT message_id, reader_kind, reader_id, is_read, read_at FROM message_read_statuses
             WHERE message_id = ? AND reader_kind = ? AND reader_id = ?",
        )
        .bind(message_id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(status_from_row).transpose()
    }

    pub async fn for_room(&self, room_id: i64) -> ChatResult<Vec<ReadStatus>> {
        let rows = sqlx::query(
            "SELECT s.message_id, s.reader_kind, s.reader_id, s.is_read, s.read_at
             FROM message_read_statuses s
             JOIN messages m ON m.id = s.message_id
             WHERE m.room_id = ?
             ORDER BY s.message_id, s.id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_from_row).collect()
    }

    pub async fn unread_count(&self, room_id: i64, reader: ParticipantRef) -> ChatResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS unread FROM message_read_statuses s
             JOIN messages m ON m.id = s.message_id
             WHERE m.room_id = ? AND s.reader_kind = ? AND s.reader_id = ? AND s.is_read = 0",
        )
        .bind(room_id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("unread")?)
    }
}

fn status_from_row(row: &SqliteRow) -> ChatResult<ReadStatus> {
    let read_at: Option<String> = row.try_get("read_at")?;
    Ok(ReadStatus {
        message_id: row.try_get("message_id")?,
        reader: participant_from_row(row, "reader_kind", "reader_id")?,
        is_read: row.try_get("is_read")?,
        read_at: read_at.as_deref().map(parse_timestamp).transpose()?,
    })
}
