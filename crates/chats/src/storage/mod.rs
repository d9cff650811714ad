//! Blob storage seam for attachment bytes.

mod local;

pub use local::LocalBlobStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not find a free name for {0}")]
    NameExhausted(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

/// Where a blob ended up, and how large it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub reference: String,
    pub size: u64,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`. Existing blobs are never overwritten; the
    /// returned reference may differ from `key`.
    async fn put(&self, key: &str, bytes: Bytes) -> Result<StoredBlob, StorageError>;

    async fn delete(&self, reference: &str) -> Result<(), StorageError>;

    /// Public URL for a stored reference.
    fn url(&self, reference: &str) -> String;
}
