use backstage_users::ParticipantRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attachment;

/// A persisted chat message. Immutable after creation apart from `is_read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub room_id: Option<i64>,
    pub sender: ParticipantRef,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Legacy aggregate: every recipient has read the message.
    pub is_read: bool,
    pub attachment: Option<Attachment>,
}

impl Message {
    pub fn is_from(&self, participant: &ParticipantRef) -> bool {
        self.sender == *participant
    }
}
