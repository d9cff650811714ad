//! Request and response payloads of the REST surface.

use std::collections::HashMap;

use backstage_chats::utils::time::format_timestamp;
use backstage_chats::{ChatRoom, Message, ReadStatus};
use backstage_users::{Participant, ParticipantKind, ParticipantRef};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, UsernameCache};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantPayload {
    pub id: i64,
    pub kind: String,
    pub username: String,
}

impl From<&Participant> for ParticipantPayload {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            kind: participant.kind.to_string(),
            username: participant.username.clone(),
        }
    }
}

/// `{id, kind}` naming another participant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantSelector {
    #[serde(alias = "participant_id")]
    pub id: i64,
    #[serde(alias = "participant_kind")]
    pub kind: String,
}

impl ParticipantSelector {
    pub fn reference(&self) -> ApiResult<ParticipantRef> {
        let kind: ParticipantKind = self
            .kind
            .parse()
            .map_err(|error: backstage_users::UserError| ApiError::bad_request(error.to_string()))?;
        Ok(ParticipantRef::new(kind, self.id))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePairwiseRoomRequest {
    pub participant_id: i64,
    pub participant_kind: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNamedRoomRequest {
    pub name: String,
    #[serde(default)]
    pub participants: Vec<ParticipantSelector>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentPayload {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadStatusPayload {
    pub reader_id: i64,
    pub reader_kind: String,
    pub is_read: bool,
    pub read_at: Option<String>,
}

impl From<&ReadStatus> for ReadStatusPayload {
    fn from(status: &ReadStatus) -> Self {
        Self {
            reader_id: status.reader.id,
            reader_kind: status.reader.kind.to_string(),
            is_read: status.is_read,
            read_at: status.read_at.map(format_timestamp),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessagePayload {
    pub id: i64,
    pub room_id: Option<i64>,
    pub sender_id: i64,
    pub sender_kind: String,
    pub sender_username: Option<String>,
    pub content: String,
    pub timestamp: String,
    pub is_current_user: bool,
    /// Every recipient has read the message.
    pub is_read: bool,
    pub attachment: Option<AttachmentPayload>,
    #[serde(default)]
    pub read_status: Vec<ReadStatusPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomPayload {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub participants: Vec<ParticipantPayload>,
    pub last_message: Option<MessagePayload>,
    pub unread_count: i64,
    /// Set by room creation endpoints only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContactPayload {
    pub participant_id: i64,
    pub participant_kind: String,
    pub username: String,
    pub room_id: i64,
    pub latest_message: Option<String>,
    pub latest_timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub marked_read_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    pub success: bool,
    pub message_id: i64,
    /// False when the message was already read.
    pub newly_read: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    pub room_id: i64,
    pub unread_count: i64,
}

/// Builds message payloads for one caller.
pub struct MessageRenderer<'a> {
    state: &'a AppState,
    caller: ParticipantRef,
    usernames: UsernameCache,
}

impl<'a> MessageRenderer<'a> {
    pub fn new(state: &'a AppState, caller: &Participant) -> Self {
        let mut usernames = UsernameCache::new(state.resolver());
        usernames.seed(caller);
        Self {
            state,
            caller: caller.reference(),
            usernames,
        }
    }

    pub async fn render(
        &mut self,
        message: &Message,
        statuses: &[ReadStatus],
    ) -> ApiResult<MessagePayload> {
        let attachment = message.attachment.as_ref().map(|attachment| AttachmentPayload {
            url: self.state.chats().messages.attachment_url(attachment),
            name: attachment.name.clone(),
            file_type: attachment.file_type.to_string(),
            size: attachment.size,
        });

        Ok(MessagePayload {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender.id,
            sender_kind: message.sender.kind.to_string(),
            sender_username: self.usernames.username(message.sender).await?,
            content: message.content.clone(),
            timestamp: format_timestamp(message.timestamp),
            is_current_user: message.is_from(&self.caller),
            is_read: message.is_read,
            attachment,
            read_status: statuses.iter().map(ReadStatusPayload::from).collect(),
        })
    }

    /// Messages with their read statuses grouped per message.
    pub async fn render_all(
        &mut self,
        messages: &[Message],
        statuses: Vec<ReadStatus>,
    ) -> ApiResult<Vec<MessagePayload>> {
        let mut by_message: HashMap<i64, Vec<ReadStatus>> = HashMap::new();
        for status in statuses {
            by_message.entry(status.message_id).or_default().push(status);
        }

        let mut payloads = Vec::with_capacity(messages.len());
        for message in messages {
            let statuses = by_message.remove(&message.id).unwrap_or_default();
            payloads.push(self.render(message, &statuses).await?);
        }
        Ok(payloads)
    }

    /// Room summary with participants, latest message and the caller's unread count.
    pub async fn room(&mut self, room: &ChatRoom) -> ApiResult<RoomPayload> {
        let chats = self.state.chats();
        let participants = chats.rooms.participants(room.id).await?;
        let last_message = match chats.messages.latest_message(room.id).await? {
            Some(message) => Some(self.render(&message, &[]).await?),
            None => None,
        };
        let unread_count = chats.reads.unread_count(room.id, self.caller).await?;

        Ok(RoomPayload {
            id: room.id,
            name: room.name.clone(),
            created_at: format_timestamp(room.created_at),
            participants: participants.iter().map(ParticipantPayload::from).collect(),
            last_message,
            unread_count,
            created: None,
        })
    }
}
