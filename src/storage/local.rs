use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::{FileStore, StorageError};
use crate::filename::FileKey;
use crate::models::StoredFile;

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Creates `root` (and parents) if missing.
    pub async fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("creating upload directory {}", root.display()))?;
        Ok(LocalStore { root })
    }

    fn path_for(&self, key: &FileKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

#[async_trait]
impl FileStore for LocalStore {
    async fn put(&self, file: &StoredFile) -> Result<(), StorageError> {
        fs::write(self.path_for(&file.key), &file.bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &FileKey) -> Result<StoredFile, StorageError> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(StoredFile::new(key.clone(), bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("local directory {}", self.root.display())
    }
}
