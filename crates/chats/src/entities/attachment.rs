use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::ChatError;

/// Attachment category, fixed at message creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    Audio,
    Video,
    Document,
    Other,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Image => "image",
            AttachmentType::Audio => "audio",
            AttachmentType::Video => "video",
            AttachmentType::Document => "document",
            AttachmentType::Other => "other",
        }
    }

    /// Infer the category from the filename extension.
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("jpg" | "jpeg" | "png" | "gif") => AttachmentType::Image,
            Some("mp3" | "wav" | "ogg") => AttachmentType::Audio,
            Some("mp4" | "mov" | "avi") => AttachmentType::Video,
            Some("pdf" | "doc" | "docx" | "txt" | "xlsx") => AttachmentType::Document,
            _ => AttachmentType::Other,
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachmentType {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(AttachmentType::Image),
            "audio" => Ok(AttachmentType::Audio),
            "video" => Ok(AttachmentType::Video),
            "document" => Ok(AttachmentType::Document),
            "other" => Ok(AttachmentType::Other),
            other => Err(ChatError::internal(format!("unknown attachment type '{other}'"))),
        }
    }
}

/// Stored attachment metadata on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Blob store reference, e.g. `chat_attachments/room_4/track.mp3`.
    pub reference: String,
    pub file_type: AttachmentType,
    pub name: String,
    pub size: i64,
}

/// Attachment bytes supplied with a new message.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub filename: String,
    pub bytes: Bytes,
    /// Display name; defaults to the filename.
    pub name: Option<String>,
    /// Explicit category; inferred from the filename when absent.
    pub file_type: Option<AttachmentType>,
}

impl AttachmentUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            name: None,
            file_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, file_type: AttachmentType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn resolved_type(&self) -> AttachmentType {
        self.file_type
            .unwrap_or_else(|| AttachmentType::from_filename(&self.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table() {
        assert_eq!(AttachmentType::from_filename("track.mp3"), AttachmentType::Audio);
        assert_eq!(AttachmentType::from_filename("cover.JPEG"), AttachmentType::Image);
        assert_eq!(AttachmentType::from_filename("clip.mov"), AttachmentType::Video);
        assert_eq!(AttachmentType::from_filename("split.xlsx"), AttachmentType::Document);
        assert_eq!(AttachmentType::from_filename("notes.xyz"), AttachmentType::Other);
        assert_eq!(AttachmentType::from_filename("README"), AttachmentType::Other);
    }

    #[test]
    fn explicit_type_wins_over_extension() {
        let upload = AttachmentUpload::new("stems.zip", Bytes::from_static(b"zip"))
            .with_type(AttachmentType::Audio);
        assert_eq!(upload.resolved_type(), AttachmentType::Audio);
    }
}
