//! Domain entities for the chat system.

pub mod attachment;
pub mod message;
pub mod read_status;
pub mod room;

pub use attachment::{Attachment, AttachmentType, AttachmentUpload};
pub use message::Message;
pub use read_status::ReadStatus;
pub use room::{ChatRoom, Contact, RoomParticipant};
