//! Attachment bytes live behind [`BlobStore`]; rows only record the key.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncRead;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return the path to record on the attachment.
    async fn put(&self, key: &str, data: &[u8]) -> std::io::Result<String>;

    async fn open(&self, path: &str) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>>;

    async fn remove(&self, path: &str) -> std::io::Result<()>;
}

pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> std::io::Result<PathBuf> {
        // Keys are generated server-side; anything else is refused.
        if path.is_empty() || path.contains(['/', '\\']) || path.starts_with('.') {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid blob path: {}", path),
            ));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> std::io::Result<String> {
        let target = self.resolve(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&target, data).await?;
        Ok(key.to_string())
    }

    async fn open(&self, path: &str) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = tokio::fs::File::open(self.resolve(path)?).await?;
        Ok(Box::new(file))
    }

    async fn remove(&self, path: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.resolve(path)?).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
