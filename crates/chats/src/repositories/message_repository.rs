//! Repository for message data access operations.

use std::str::FromStr;

use backstage_users::ParticipantRef;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use super::participant_from_row;
use crate::entities::{Attachment, AttachmentType, Message};
use crate::types::ChatResult;
use crate::utils::time::{format_timestamp, parse_timestamp};

const MESSAGE_COLUMNS: &str = "id, room_id, sender_kind, sender_id, content, timestamp, is_read, \
                               file_reference, file_type, file_name, file_size";

/// Row to insert; the id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub room_id: i64,
    pub sender: ParticipantRef,
    pub content: &'a str,
    pub timestamp: DateTime<Utc>,
    pub attachment: Option<&'a Attachment>,
}

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn latest_timestamp<'e, E>(executor: E, room_id: i64) -> ChatResult<Option<DateTime<Utc>>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT MAX(timestamp) AS latest FROM messages WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(executor)
            .await?;

        let latest: Option<String> = row.try_get("latest")?;
        latest.as_deref().map(parse_timestamp).transpose()
    }

    pub async fn insert<'e, E>(executor: E, message: &NewMessage<'_>) -> ChatResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let attachment = message.attachment;
        let result = sqlx::query(
            "INSERT INTO messages
                (room_id, sender_kind, sender_id, content, timestamp, is_read,
                 file_reference, file_type, file_name, file_size)
             VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)",
        )
        .bind(message.room_id)
        .bind(message.sender.kind.as_str())
        .bind(message.sender.id)
        .bind(message.content)
        .bind(format_timestamp(message.timestamp))
        .bind(attachment.map(|a| a.reference.as_str()))
        .bind(attachment.map(|a| a.file_type.as_str()))
        .bind(attachment.map(|a| a.name.as_str()))
        .bind(attachment.map(|a| a.size))
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    /// Messages of a room in append order.
    pub async fn list_for_room(&self, room_id: i64) -> ChatResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = ? ORDER BY timestamp, id"
        );
        let rows = sqlx::query(&sql)
            .bind(room_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(message_from_row).collect()
    }

    pub async fn latest_for_room(&self, room_id: i64) -> ChatResult<Option<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_id = ?
             ORDER BY timestamp DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    /// Recompute the legacy `is_read` flag of one message from its read statuses.
    pub async fn refresh_read_flag<'e, E>(executor: E, message_id: i64) -> ChatResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE messages SET is_read = NOT EXISTS (
                SELECT 1 FROM message_read_statuses s
                WHERE s.message_id = messages.id AND s.is_read = 0)
             WHERE id = ?",
        )
        .bind(message_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Same as [`Self::refresh_read_flag`] for every message in the room not sent by `reader`.
    pub async fn refresh_read_flags_for_reader<'e, E>(
        executor: E,
        room_id: i64,
        reader: ParticipantRef,
    ) -> ChatResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE messages SET is_read = NOT EXISTS (
                SELECT 1 FROM message_read_statuses s
                WHERE s.message_id = messages.id AND s.is_read = 0)
             WHERE room_id = ? AND NOT (sender_kind = ? AND sender_id = ?)",
        )
        .bind(room_id)
        .bind(reader.kind.as_str())
        .bind(reader.id)
        .execute(executor)
        .await?;

        Ok(())
    }
}

fn message_from_row(row: &SqliteRow) -> ChatResult<Message> {
    let timestamp: String = row.try_get("timestamp")?;
    let reference: Option<String> = row.try_get("file_reference")?;

    let attachment = match reference {
        Some(reference) => {
            let file_type: Option<String> = row.try_get("file_type")?;
            let name: Option<String> = row.try_get("file_name")?;
            let size: Option<i64> = row.try_get("file_size")?;
            let file_type = match file_type {
                Some(value) => AttachmentType::from_str(&value)?,
                None => AttachmentType::from_filename(&reference),
            };
            let name = name.unwrap_or_else(|| {
                reference
                    .rsplit('/')
                    .next()
                    .unwrap_or(reference.as_str())
                    .to_string()
            });

            Some(Attachment {
                reference,
                file_type,
                name,
                size: size.unwrap_or_default(),
            })
        }
        None => None,
    };

    Ok(Message {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        sender: participant_from_row(row, "sender_kind", "sender_id")?,
        content: row.try_get("content")?,
        timestamp: parse_timestamp(&timestamp)?,
        is_read: row.try_get("is_read")?,
        attachment,
    })
}
