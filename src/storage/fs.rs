//! Local-directory object store
//!
//! Each bucket is a directory under the configured root. Used for development and
//! single-host deployments without an S3 endpoint.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::BucketNames;
use crate::error::{Result, TryOnError};

use super::artifact::{ScratchSpace, TransientArtifact};
use super::key::check_key_segment;
use super::traits::{Bucket, ObjectStore};

pub struct FsObjectStore {
    root: PathBuf,
    buckets: BucketNames,
    scratch: ScratchSpace,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, buckets: BucketNames, scratch: ScratchSpace) -> Self {
        Self {
            root: root.into(),
            buckets,
            scratch,
        }
    }

    fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(self.buckets.name(bucket))
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> Result<PathBuf> {
        check_key_segment(key)?;
        Ok(self.bucket_dir(bucket).join(key))
    }

    fn unavailable(&self, e: std::io::Error) -> TryOnError {
        TryOnError::StorageUnavailable(format!("{}: {}", self.root.display(), e))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn fetch(&self, bucket: Bucket, key: &str) -> Result<TransientArtifact> {
        let source = self.object_path(bucket, key)?;
        let artifact = self.scratch.allocate(key)?;

        match tokio::fs::copy(&source, artifact.path()).await {
            Ok(bytes) => {
                debug!("Fetched {}/{} ({} bytes)", self.buckets.name(bucket), key, bytes);
                Ok(artifact)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TryOnError::StorageNotFound {
                bucket: self.buckets.name(bucket).to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(self.unavailable(e)),
        }
    }

    async fn store(&self, bucket: Bucket, key: &str, local_path: &Path, _content_type: &str) -> Result<()> {
        let target = self.object_path(bucket, key)?;
        let dir = self.bucket_dir(bucket);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| self.unavailable(e))?;

        // Stage next to the target so the final rename is atomic
        let staging = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&dir)
            .map_err(|e| self.unavailable(e))?
            .into_temp_path();

        tokio::fs::copy(local_path, &staging)
            .await
            .map_err(|e| self.unavailable(e))?;
        staging.persist(&target).map_err(|e| self.unavailable(e.error))?;

        debug!("Stored {}/{}", self.buckets.name(bucket), key);
        Ok(())
    }

    async fn ensure_buckets(&self) -> Result<()> {
        for bucket in Bucket::ALL {
            let dir = self.bucket_dir(bucket);
            if !dir.is_dir() {
                tokio::fs::create_dir_all(&dir).await.map_err(|e| self.unavailable(e))?;
                info!("Bucket {} created at {}", self.buckets.name(bucket), dir.display());
            }
        }
        Ok(())
    }
}
