//! Read-status lifecycle.
//!
//! Unread rows only come from the fan-out at message creation. Explicit reads
//! by a room participant (single, bulk, or implied by listing) record a read
//! row even when none was fanned out, so a late joiner's reads are kept while
//! their unread count for older messages stays zero.

use std::time::Duration;

use backstage_users::ParticipantRef;
use sqlx::SqlitePool;
use tracing::debug;

use crate::entities::ReadStatus;
use crate::repositories::{MessageRepository, ReadStatusRepository, RoomRepository};
use crate::types::{ChatError, ChatResult};
use crate::utils::{time, with_timeout};

#[derive(Clone)]
pub struct ReadTracker {
    pool: SqlitePool,
    rooms: RoomRepository,
    messages: MessageRepository,
    statuses: ReadStatusRepository,
    timeout: Duration,
}

impl ReadTracker {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self {
            rooms: RoomRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            statuses: ReadStatusRepository::new(pool.clone()),
            pool,
            timeout,
        }
    }

    /// Mark one message read for `reader`. Returns `false` if it already was.
    pub async fn mark_read(&self, message_id: i64, reader: ParticipantRef) -> ChatResult<bool> {
        with_timeout(self.timeout, "mark_read", async {
            let message = self
                .messages
                .find_by_id(message_id)
                .await?
                .ok_or_else(|| ChatError::message_not_found(message_id))?;

            if message.is_from(&reader) {
                return Err(ChatError::SelfRead);
            }
            let room_id = message
                .room_id
                .ok_or_else(|| ChatError::message_not_found(message_id))?;
            if !self.rooms.has_participant(room_id, reader).await? {
                return Err(ChatError::forbidden(format!(
                    "{reader} is not a participant of room {room_id}"
                )));
            }

            let now = time::now();
            let mut tx = self.pool.begin().await?;
            let mut recorded = ReadStatusRepository::mark_read(&mut *tx, message_id, reader, now).await?;
            if !recorded {
                recorded = ReadStatusRepository::insert_read(&mut *tx, message_id, reader, now).await?;
            }

            if !recorded {
                tx.rollback().await?;
                return Ok(false);
            }

            MessageRepository::refresh_read_flag(&mut *tx, message_id).await?;
            tx.commit().await?;

            debug!(message_id, reader = %reader, "message marked read");
            Ok(true)
        })
        .await
    }

    /// Mark every message in the room from someone else read for `reader`.
    ///
    /// Returns how many unread rows flipped. Messages the reader has no row
    /// for get a read row, which is not counted.
    pub async fn mark_all_read(&self, room_id: i64, reader: ParticipantRef) -> ChatResult<u64> {
        with_timeout(self.timeout, "mark_all_read", async {
            if self.rooms.find_by_id(room_id).await?.is_none() {
                return Err(ChatError::room_not_found(room_id));
            }
            if !self.rooms.has_participant(room_id, reader).await? {
                return Err(ChatError::forbidden(format!(
                    "{reader} is not a participant of room {room_id}"
                )));
            }

            let now = time::now();
            let mut tx = self.pool.begin().await?;
            let marked = ReadStatusRepository::mark_room_read(&mut *tx, room_id, reader, now).await?;
            let backfilled =
                ReadStatusRepository::backfill_room_read(&mut *tx, room_id, reader, now).await?;

            if marked + backfilled > 0 {
                MessageRepository::refresh_read_flags_for_reader(&mut *tx, room_id, reader).await?;
            }
            tx.commit().await?;

            debug!(room_id, reader = %reader, marked, backfilled, "room marked read");
            Ok(marked)
        })
        .await
    }

    /// Unread status rows of `reader` in the room.
    pub async fn unread_count(&self, room_id: i64, reader: ParticipantRef) -> ChatResult<i64> {
        with_timeout(self.timeout, "unread_count", self.statuses.unread_count(room_id, reader)).await
    }

    pub async fn status(&self, message_id: i64, reader: ParticipantRef) -> ChatResult<Option<ReadStatus>> {
        with_timeout(self.timeout, "read_status", self.statuses.find(message_id, reader)).await
    }

    /// All status rows for messages in the room, grouped by message id order.
    pub async fn statuses_for_room(&self, room_id: i64) -> ChatResult<Vec<ReadStatus>> {
        with_timeout(self.timeout, "statuses_for_room", self.statuses.for_room(room_id)).await
    }
}
