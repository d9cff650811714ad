use backstage_users::ParticipantRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-recipient read state of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadStatus {
    pub message_id: i64,
    pub reader: ParticipantRef,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}
