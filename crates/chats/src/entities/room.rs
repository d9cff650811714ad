use backstage_users::{Participant, ParticipantRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Message;

/// A named message channel. Membership lives in [`RoomParticipant`] links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// Deterministic name of the pairwise room between two participants.
    ///
    /// ```
    /// use backstage_chats::ChatRoom;
    /// use backstage_users::{Participant, ParticipantRef};
    ///
    /// let name = ChatRoom::pairwise_name(
    ///     ParticipantRef::producer(1_000_000),
    ///     ParticipantRef::artist(5),
    /// );
    /// assert_eq!(name, "chat_5_1000000");
    /// ```
    pub fn pairwise_name(a: ParticipantRef, b: ParticipantRef) -> String {
        format!("chat_{}_{}", a.id.min(b.id), a.id.max(b.id))
    }

    /// Uniqueness key for the unordered pair. Unlike the name, it keeps the kinds.
    pub fn pair_key(a: ParticipantRef, b: ParticipantRef) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("{low}|{high}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomParticipant {
    pub room_id: i64,
    pub participant: ParticipantRef,
    pub joined_at: DateTime<Utc>,
}

/// Another participant the caller shares a room with, and that room's latest activity.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub participant: Participant,
    pub room_id: i64,
    pub latest_message: Option<Message>,
}

impl Contact {
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.latest_message.as_ref().map(|message| message.timestamp)
    }
}
