//! Object store abstraction
//!
//! Defines typed access to the three logical buckets.
//! Implementations can be swapped between S3-compatible storage and a local directory.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::config::BucketNames;
use crate::error::Result;

use super::artifact::TransientArtifact;

/// Logical buckets used by the try-on workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    BodyImages,
    Garments,
    Results,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::BodyImages, Bucket::Garments, Bucket::Results];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::BodyImages => "body_images",
            Bucket::Garments => "garments",
            Bucket::Results => "results",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BucketNames {
    /// Physical bucket name for a logical bucket
    pub fn name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::BodyImages => &self.body_images,
            Bucket::Garments => &self.garments,
            Bucket::Results => &self.results,
        }
    }
}

/// Object store gateway.
/// Implementations must be thread-safe and async-compatible
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Download an object into a freshly allocated transient artifact.
    ///
    /// Fails with `StorageNotFound` when the key is absent and
    /// `StorageUnavailable` on connectivity or auth failures.
    async fn fetch(&self, bucket: Bucket, key: &str) -> Result<TransientArtifact>;

    /// Upload a local file, overwriting any existing object at `key`
    async fn store(&self, bucket: Bucket, key: &str, local_path: &Path, content_type: &str) -> Result<()>;

    /// Make sure every configured bucket exists
    async fn ensure_buckets(&self) -> Result<()>;
}
