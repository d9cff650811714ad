//! # Backstage Chats Crate
//!
//! Chat rooms shared by artists and producers, message persistence and
//! per-recipient read tracking.
//!
//! ## Architecture
//!
//! - **Entities**: `ChatRoom`, `Message`, `Attachment`, `ReadStatus`
//! - **Services**: `RoomDirectory`, `MessageStore`, `ReadTracker`
//! - **Repositories**: SQLite data access
//! - **Storage**: the `BlobStore` seam for attachment bytes
//! - **Utils**: timestamps, validation, keyed locks, store timeouts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use backstage_chats::ChatServices;
//!
//! let chats = ChatServices::new(pool, resolver, blobs, store_timeout);
//! let (room, _created) = chats.rooms.get_or_create_pairwise(me, them).await?;
//! let message = chats.messages.post_message(room.id, me, "hello", None).await?;
//! ```

pub mod entities;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod types;
pub mod utils;

pub use entities::{
    Attachment, AttachmentType, AttachmentUpload, ChatRoom, Contact, Message, ReadStatus,
    RoomParticipant,
};
pub use services::{ChatServices, MessageStore, ReadTracker, RoomDirectory};
pub use storage::{BlobStore, LocalBlobStore, StorageError, StoredBlob};
pub use types::{ChatError, ChatResult, ErrorKind};
