//! Repository for rooms and participant links.

use backstage_users::ParticipantRef;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use super::participant_from_row;
use crate::entities::{ChatRoom, RoomParticipant};
use crate::types::ChatResult;
use crate::utils::time::{format_timestamp, parse_timestamp};

#[derive(Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<ChatRoom>> {
        let row = sqlx::query("SELECT id, name, created_at FROM chat_rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    /// Oldest room carrying `name`. Names are not unique.
    pub async fn find_by_name(&self, name: &str) -> ChatResult<Option<ChatRoom>> {
        let row = sqlx::query(
            "SELECT id, name, created_at FROM chat_rooms WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    pub async fn find_by_pair_key(&self, pair_key: &str) -> ChatResult<Option<ChatRoom>> {
        let row = sqlx::query("SELECT id, name, created_at FROM chat_rooms WHERE pair_key = ?")
            .bind(pair_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(room_from_row).transpose()
    }

    /// Insert a room. Returns `None` when `pair_key` is already taken.
    pub async fn insert<'e, E>(
        executor: E,
        name: &str,
        pair_key: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> ChatResult<Option<ChatRoom>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO chat_rooms (name, pair_key, created_at) VALUES (?, ?, ?)
             ON CONFLICT(pair_key) DO NOTHING",
        )
        .bind(name)
        .bind(pair_key)
        .bind(format_timestamp(created_at))
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(ChatRoom {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        }))
    }

    /// Link a participant to a room. Returns `false` when the link already existed.
    pub async fn insert_participant<'e, E>(
        executor: E,
        room_id: i64,
        participant: ParticipantRef,
        joined_at: DateTime<Utc>,
    ) -> ChatResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO chat_room_participants (chat_room_id, participant_kind, participant_id, joined_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(chat_room_id, participant_kind, participant_id) DO NOTHING",
        )
        .bind(room_id)
        .bind(participant.kind.as_str())
        .bind(participant.id)
        .bind(format_timestamp(joined_at))
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_participant(&self, room_id: i64, participant: ParticipantRef) -> ChatResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM chat_room_participants
             WHERE chat_room_id = ? AND participant_kind = ? AND participant_id = ?",
        )
        .bind(room_id)
        .bind(participant.kind.as_str())
        .bind(participant.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    pub async fn rooms_for(&self, participant: ParticipantRef) -> ChatResult<Vec<ChatRoom>> {
        let rows = sqlx::query(
            "SELECT r.id, r.name, r.created_at FROM chat_rooms r
             JOIN chat_room_participants p ON p.chat_room_id = r.id
             WHERE p.participant_kind = ? AND p.participant_id = ?
             ORDER BY r.id",
        )
        .bind(participant.kind.as_str())
        .bind(participant.id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(room_from_row).collect()
    }

    /// Rooms both participants are linked to, lowest id first.
    pub async fn common_rooms(&self, a: ParticipantRef, b: ParticipantRef) -> ChatResult<Vec<ChatRoom>> {
        let rows = sqlx::query(
            "SELECT r.id, r.name, r.created_at FROM chat_rooms r
             JOIN chat_room_participants pa
               ON pa.chat_room_id = r.id AND pa.participant_kind = ? AND pa.participant_id = ?
             JOIN chat_room_participants pb
               ON pb.chat_room_id = r.id AND pb.participant_kind = ? AND pb.participant_id = ?
             ORDER BY r.id",
        )
        .bind(a.kind.as_str())
        .bind(a.id)
        .bind(b.kind.as_str())
        .bind(b.id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(room_from_row).collect()
    }

    /// Links of a room in join order.
    pub async fn participants(&self, room_id: i64) -> ChatResult<Vec<RoomParticipant>> {
        let rows = sqlx::query(
            "SELECT chat_room_id, participant_kind, participant_id, joined_at
             FROM chat_room_participants WHERE chat_room_id = ? ORDER BY id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let joined_at: String = row.try_get("joined_at")?;
                Ok(RoomParticipant {
                    room_id: row.try_get("chat_room_id")?,
                    participant: participant_from_row(row, "participant_kind", "participant_id")?,
                    joined_at: parse_timestamp(&joined_at)?,
                })
            })
            .collect()
    }

    /// Every `(other participant, room id)` pair for rooms the participant is in.
    pub async fn co_participants(
        &self,
        participant: ParticipantRef,
    ) -> ChatResult<Vec<(ParticipantRef, i64)>> {
        let rows = sqlx::query(
            "SELECT other.participant_kind, other.participant_id, other.chat_room_id
             FROM chat_room_participants me
             JOIN chat_room_participants other
               ON other.chat_room_id = me.chat_room_id
              AND NOT (other.participant_kind = me.participant_kind
                       AND other.participant_id = me.participant_id)
             WHERE me.participant_kind = ? AND me.participant_id = ?
             ORDER BY other.chat_room_id, other.id",
        )
        .bind(participant.kind.as_str())
        .bind(participant.id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    participant_from_row(row, "participant_kind", "participant_id")?,
                    row.try_get("chat_room_id")?,
                ))
            })
            .collect()
    }
}

fn room_from_row(row: &SqliteRow) -> ChatResult<ChatRoom> {
    let created_at: String = row.try_get("created_at")?;
    Ok(ChatRoom {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
