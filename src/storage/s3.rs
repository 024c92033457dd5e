//! S3-compatible object store (MinIO, AWS S3)

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::{BucketNames, StorageConfig};
use crate::error::{Result, TryOnError};
use crate::utils::with_deadline;

use super::artifact::{ScratchSpace, TransientArtifact};
use super::traits::{Bucket, ObjectStore};

/// Object store backed by an S3 endpoint with path-style addressing
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    buckets: BucketNames,
    scratch: ScratchSpace,
    timeout: Duration,
}

impl S3ObjectStore {
    /// Build a client for the configured endpoint and static credentials
    pub async fn connect(config: &StorageConfig, scratch: ScratchSpace) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "tryon-config",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            // Failed calls surface to the workflow, which never retries
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        info!("S3 object store at {}", config.endpoint_url());

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            buckets: config.buckets.clone(),
            scratch,
            timeout: config.timeout(),
        }
    }

    async fn download(&self, bucket_name: &str, key: &str, artifact: &TransientArtifact) -> Result<u64> {
        let output = self
            .client
            .get_object()
            .bucket(bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    TryOnError::StorageNotFound {
                        bucket: bucket_name.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    unavailable("get_object", e)
                }
            })?;

        let mut body = output.body;
        let mut file = tokio::fs::File::create(artifact.path()).await?;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| TryOnError::StorageUnavailable(format!("get_object body: {}", e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn upload(&self, bucket_name: &str, key: &str, local_path: &Path, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| TryOnError::StorageUnavailable(format!("read {}: {}", local_path.display(), e)))?;

        self.client
            .put_object()
            .bucket(bucket_name)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| unavailable("put_object", e))
    }

    async fn ensure_bucket(&self, bucket_name: &str) -> Result<()> {
        if self.client.head_bucket().bucket(bucket_name).send().await.is_ok() {
            return Ok(());
        }

        match self.client.create_bucket().bucket(bucket_name).send().await {
            Ok(_) => {
                info!("Bucket {} created successfully", bucket_name);
                Ok(())
            }
            Err(e) if matches!(e.code(), Some("BucketAlreadyOwnedByYou") | Some("BucketAlreadyExists")) => Ok(()),
            Err(e) => Err(unavailable("create_bucket", e)),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn fetch(&self, bucket: Bucket, key: &str) -> Result<TransientArtifact> {
        let bucket_name = self.buckets.name(bucket);
        let artifact = self.scratch.allocate(key)?;

        let bytes = with_deadline("object fetch", self.timeout, self.download(bucket_name, key, &artifact)).await?;
        debug!("Fetched {}/{} ({} bytes)", bucket_name, key, bytes);

        Ok(artifact)
    }

    async fn store(&self, bucket: Bucket, key: &str, local_path: &Path, content_type: &str) -> Result<()> {
        let bucket_name = self.buckets.name(bucket);
        with_deadline(
            "object store",
            self.timeout,
            self.upload(bucket_name, key, local_path, content_type),
        )
        .await?;
        debug!("Stored {}/{} as {}", bucket_name, key, content_type);
        Ok(())
    }

    async fn ensure_buckets(&self) -> Result<()> {
        for bucket in Bucket::ALL {
            let bucket_name = self.buckets.name(bucket);
            with_deadline("bucket setup", self.timeout, self.ensure_bucket(bucket_name)).await?;
        }
        Ok(())
    }
}

fn is_not_found<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    match err {
        SdkError::ServiceError(service) => {
            matches!(service.err().code(), Some("NoSuchKey") | Some("NotFound"))
        }
        _ => false,
    }
}

fn unavailable<E, R>(operation: &str, err: SdkError<E, R>) -> TryOnError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    TryOnError::StorageUnavailable(format!("{} failed: {}", operation, DisplayErrorContext(&err)))
}
