mod local;
mod s3;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::filename::FileKey;
use crate::models::StoredFile;

pub use local::LocalStore;
pub use s3::S3Store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no stored file named {0}")]
    NotFound(FileKey),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store request failed")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Flat namespace of files addressed by [`FileKey`]. Writes are
/// last-write-wins and nothing is retried.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, file: &StoredFile) -> Result<(), StorageError>;

    async fn get(&self, key: &FileKey) -> Result<StoredFile, StorageError>;

    /// Human readable location, for startup logging.
    fn describe(&self) -> String;
}

/// Builds the backend selected by `config`, creating the local root if needed.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn FileStore>> {
    let store: Arc<dyn FileStore> = match config {
        StorageConfig::Local { root } => Arc::new(LocalStore::create(root).await?),
        StorageConfig::S3(s3) => Arc::new(S3Store::connect(s3).await),
    };
    Ok(store)
}
