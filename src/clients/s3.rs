// restoretool/src/clients/s3.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::path::Path;

use crate::config::StorageConfig;
use crate::restore::components::BlobStore;

/// Uploads objects to an S3-compatible bucket (GCS interop, Spaces, MinIO).
pub struct S3BlobStore {
    client: s3::Client,
    bucket_name: String,
    folder_prefix: Option<String>,
}

impl S3BlobStore {
    pub async fn connect(storage_config: &StorageConfig) -> Self {
        let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .endpoint_url(&storage_config.endpoint_url)
            .region(Region::new(storage_config.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &storage_config.access_key_id,
                &storage_config.secret_access_key,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ))
            .load()
            .await;

        S3BlobStore {
            client: s3::Client::new(&sdk_config),
            bucket_name: storage_config.bucket_name.clone(),
            folder_prefix: storage_config.folder_prefix.clone(),
        }
    }

    fn object_key(&self, object_name: &str) -> String {
        object_key(self.folder_prefix.as_deref(), object_name)
    }
}

fn object_key(prefix: Option<&str>, object_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), object_name),
        None => object_name.to_string(),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, object_name: &str, source: &Path, content_type: &str) -> Result<()> {
        let key = self.object_key(object_name);
        let body = ByteStream::from_path(source)
            .await
            .with_context(|| format!("Failed to create ByteStream from file: {}", source.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to upload {} to bucket {} with key {}",
                    source.display(),
                    self.bucket_name,
                    key
                )
            })?;
        Ok(())
    }
}
