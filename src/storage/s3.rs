use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use super::{FileStore, StorageError};
use crate::config::S3Config;
use crate::filename::FileKey;
use crate::models::{content_type_for, StoredFile};

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Loads credentials and region from the standard AWS environment once.
    pub async fn connect(config: &S3Config) -> Self {
        let shared = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared).retry_config(RetryConfig::disabled());
        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()), &config.bucket)
    }

    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        S3Store {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl FileStore for S3Store {
    async fn put(&self, file: &StoredFile) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(file.key.as_str())
            .content_type(&file.content_type)
            .body(ByteStream::from(file.bytes.clone()))
            .send()
            .await
            .map_err(|e| StorageError::Remote(Box::new(e)))?;
        debug!(bucket = %self.bucket, key = %file.key, "put object");
        Ok(())
    }

    async fn get(&self, key: &FileKey) -> Result<StoredFile, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|err| err.is_no_such_key()) => {
                return Err(StorageError::NotFound(key.clone()));
            }
            Err(e) => return Err(StorageError::Remote(Box::new(e))),
        };

        let content_type = output
            .content_type()
            .map(str::to_owned)
            .unwrap_or_else(|| content_type_for(key));
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Remote(Box::new(e)))?
            .into_bytes();

        Ok(StoredFile {
            key: key.clone(),
            bytes,
            content_type,
        })
    }

    fn describe(&self) -> String {
        format!("s3 bucket {}", self.bucket)
    }
}
