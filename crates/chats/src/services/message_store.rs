//! Message persistence with attachment handling and read-status fan-out.

use std::sync::Arc;
use std::time::Duration;

use backstage_users::ParticipantRef;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::entities::{Attachment, AttachmentUpload, Message};
use crate::repositories::{MessageRepository, NewMessage, ReadStatusRepository, RoomRepository};
use crate::storage::BlobStore;
use crate::types::{ChatError, ChatResult};
use crate::utils::{time, with_timeout, Validator};

#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
    rooms: RoomRepository,
    messages: MessageRepository,
    blobs: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl MessageStore {
    pub fn new(pool: SqlitePool, blobs: Arc<dyn BlobStore>, timeout: Duration) -> Self {
        Self {
            rooms: RoomRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            pool,
            blobs,
            timeout,
        }
    }

    /// Persist a message in `room_id`.
    ///
    /// The sender is linked to the room if it was not already, and every other
    /// current participant gets an unread status row. The link, the message and
    /// the status rows commit together.
    pub async fn post_message(
        &self,
        room_id: i64,
        sender: ParticipantRef,
        content: &str,
        attachment: Option<AttachmentUpload>,
    ) -> ChatResult<Message> {
        if Validator::is_blank(content) && attachment.is_none() {
            return Err(ChatError::EmptyMessage);
        }

        with_timeout(self.timeout, "find_room", self.rooms.find_by_id(room_id))
            .await?
            .ok_or_else(|| ChatError::room_not_found(room_id))?;

        let attachment = match attachment {
            Some(upload) => Some(self.store_attachment(room_id, upload).await?),
            None => None,
        };

        let result = with_timeout(
            self.timeout,
            "post_message",
            self.insert_message(room_id, sender, content, attachment.as_ref()),
        )
        .await;

        if result.is_err() {
            if let Some(stored) = &attachment {
                if let Err(err) = self.blobs.delete(&stored.reference).await {
                    warn!(reference = %stored.reference, error = %err, "failed to remove orphaned attachment");
                }
            }
        }

        result
    }

    async fn insert_message(
        &self,
        room_id: i64,
        sender: ParticipantRef,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> ChatResult<Message> {
        let now = time::now();
        let mut tx = self.pool.begin().await?;

        // A write first, so the transaction holds the write lock before it reads.
        let joined = RoomRepository::insert_participant(&mut *tx, room_id, sender, now).await?;

        let latest = MessageRepository::latest_timestamp(&mut *tx, room_id).await?;
        let timestamp = time::next_timestamp(now, latest);

        let id = MessageRepository::insert(
            &mut *tx,
            &NewMessage {
                room_id,
                sender,
                content,
                timestamp,
                attachment,
            },
        )
        .await?;
        let recipients =
            ReadStatusRepository::insert_unread_for_recipients(&mut *tx, id, room_id, sender).await?;

        tx.commit().await?;

        if joined {
            info!(room_id, participant = %sender, "participant joined room by posting");
        }
        info!(room_id, message_id = id, participant = %sender, recipients, "stored message");

        Ok(Message {
            id,
            room_id: Some(room_id),
            sender,
            content: content.to_string(),
            timestamp,
            is_read: false,
            attachment: attachment.cloned(),
        })
    }

    async fn store_attachment(&self, room_id: i64, upload: AttachmentUpload) -> ChatResult<Attachment> {
        let file_type = upload.resolved_type();
        let filename = Validator::filename(&upload.filename);
        let name = upload
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| filename.clone());

        let key = format!("chat_attachments/room_{room_id}/{filename}");
        let blob = self.blobs.put(&key, upload.bytes).await?;
        debug!(room_id, reference = %blob.reference, file_type = %file_type, "stored attachment");

        Ok(Attachment {
            reference: blob.reference,
            file_type,
            name,
            size: i64::try_from(blob.size).unwrap_or(i64::MAX),
        })
    }

    /// Messages of a room in timestamp order.
    pub async fn list_messages(&self, room_id: i64) -> ChatResult<Vec<Message>> {
        with_timeout(self.timeout, "list_messages", async {
            if self.rooms.find_by_id(room_id).await?.is_none() {
                return Err(ChatError::room_not_found(room_id));
            }
            self.messages.list_for_room(room_id).await
        })
        .await
    }

    pub async fn get_message(&self, message_id: i64) -> ChatResult<Message> {
        with_timeout(self.timeout, "get_message", self.messages.find_by_id(message_id))
            .await?
            .ok_or_else(|| ChatError::message_not_found(message_id))
    }

    /// Attachment metadata of a message; `None` when the message is missing or has none.
    pub async fn get_attachment(&self, message_id: i64) -> ChatResult<Option<Attachment>> {
        let message =
            with_timeout(self.timeout, "get_attachment", self.messages.find_by_id(message_id)).await?;
        Ok(message.and_then(|message| message.attachment))
    }

    pub async fn latest_message(&self, room_id: i64) -> ChatResult<Option<Message>> {
        with_timeout(self.timeout, "latest_message", self.messages.latest_for_room(room_id)).await
    }

    pub fn attachment_url(&self, attachment: &Attachment) -> String {
        self.blobs.url(&attachment.reference)
    }
}
