//! Business logic layer.

pub mod message_store;
pub mod read_tracker;
pub mod room_directory;

pub use message_store::MessageStore;
pub use read_tracker::ReadTracker;
pub use room_directory::RoomDirectory;

use std::sync::Arc;
use std::time::Duration;

use backstage_users::IdentityResolver;
use sqlx::SqlitePool;

use crate::storage::BlobStore;

/// The three messaging services sharing one pool.
#[derive(Clone)]
pub struct ChatServices {
    pub rooms: RoomDirectory,
    pub messages: MessageStore,
    pub reads: ReadTracker,
}

impl ChatServices {
    pub fn new(
        pool: SqlitePool,
        resolver: Arc<dyn IdentityResolver>,
        blobs: Arc<dyn BlobStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            rooms: RoomDirectory::new(pool.clone(), resolver, store_timeout),
            messages: MessageStore::new(pool.clone(), blobs, store_timeout),
            reads: ReadTracker::new(pool, store_timeout),
        }
    }
}
