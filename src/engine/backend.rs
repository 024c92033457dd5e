//! Inference backend abstraction

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

use super::result::InferenceResult;

/// A remote try-on model reachable through a connect/infer contract.
///
/// `connect` establishes whatever session state the backend needs; the resulting
/// handle is reused for every subsequent call.
#[async_trait]
pub trait InferenceBackend: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Backend name for logs and health reporting
    fn name(&self) -> &str;

    /// Fails with `BackendUnreachable` if the endpoint cannot be reached
    async fn connect(&self) -> Result<Self::Handle>;

    /// Run the try-on operation on a person image and a garment image.
    ///
    /// Fails with `InferenceFailed` on any remote error or malformed response.
    async fn infer(
        &self,
        handle: &Self::Handle,
        person_image: &Path,
        garment_image: &Path,
        seed: u64,
    ) -> Result<InferenceResult>;
}
