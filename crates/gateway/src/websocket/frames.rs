//! JSON frames exchanged on a chat socket.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw inbound frame. `type` defaults to `text`.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default = "RawFrame::default_type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file_info: Option<RawFileInfo>,
}

impl RawFrame {
    fn default_type() -> String {
        "text".to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RawFileInfo {
    #[serde(default)]
    message_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text { message: String },
    FileNotification { message_id: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid message format")]
    Malformed,
    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),
    #[error("File notification missing message_id")]
    MissingMessageId,
    #[error("File not found")]
    FileNotFound,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text).map_err(|_| FrameError::Malformed)?;

        match raw.kind.as_str() {
            "text" => Ok(ClientFrame::Text {
                message: raw.message.unwrap_or_default(),
            }),
            "file_notification" => raw
                .file_info
                .and_then(|info| info.message_id)
                .map(|message_id| ClientFrame::FileNotification { message_id })
                .ok_or(FrameError::MissingMessageId),
            other => Err(FrameError::UnsupportedType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: i64,
}

/// Frames fanned out to every connection of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatFrame {
    Text {
        message: String,
        username: String,
        message_id: i64,
    },
    File {
        username: String,
        message_id: i64,
        file_data: FileData,
    },
}

/// Everything a connection may write: a group frame or an error for this connection only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    Chat(ChatFrame),
    Error { error: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            error: message.into(),
        }
    }
}

impl From<ChatFrame> for ServerFrame {
    fn from(frame: ChatFrame) -> Self {
        ServerFrame::Chat(frame)
    }
}

impl From<FrameError> for ServerFrame {
    fn from(error: FrameError) -> Self {
        ServerFrame::error(error.to_string())
    }
}
