use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use super::{BlobStore, StorageError, StoredBlob};

const MAX_NAME_ATTEMPTS: usize = 8;

/// Blob store rooted in a local directory, served under `base_url`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        let path = Path::new(key);
        let valid = !key.is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }

    fn candidate(key: &str, attempt: usize) -> String {
        if attempt == 0 {
            return key.to_string();
        }

        let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
        let (dir, file) = match key.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, key),
        };
        let renamed = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
            _ => format!("{file}_{suffix}"),
        };

        match dir {
            Some(dir) => format!("{dir}/{renamed}"),
            None => renamed,
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<StoredBlob, StorageError> {
        Self::validate_key(key)?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let reference = Self::candidate(key, attempt);
            let path = self.root.join(&reference);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            let file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };

            write_or_discard(file, &path, &bytes).await?;

            debug!(reference = %reference, size = bytes.len(), "stored blob");
            return Ok(StoredBlob {
                reference,
                size: bytes.len() as u64,
            });
        }

        Err(StorageError::NameExhausted(key.to_string()))
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        Self::validate_key(reference)?;
        match fs::remove_file(self.root.join(reference)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn url(&self, reference: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), reference)
    }
}

/// Write `bytes` out in full, removing the file at `path` if that fails.
async fn write_or_discard<W>(mut writer: W, path: &Path, bytes: &[u8]) -> Result<(), StorageError>
where
    W: AsyncWrite + Unpin,
{
    let written = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(err) => Err(err),
    };
    let Err(err) = written else {
        return Ok(());
    };

    drop(writer);
    if let Err(cleanup) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %cleanup, "failed to remove partial blob");
    }
    Err(err.into())
}
