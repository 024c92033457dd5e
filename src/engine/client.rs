//! Backend Client
//!
//! Holds at most one connection handle per client, created lazily on first use and
//! kept for the life of the process. Concurrent first calls are serialized so only
//! one connect is ever in flight.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::BackendConfig;
use crate::error::{Result, TryOnError};
use crate::utils::with_deadline;

use super::backend::InferenceBackend;
use super::result::ResultRef;

pub struct BackendClient<B: InferenceBackend> {
    backend: B,
    handle: OnceCell<Arc<B::Handle>>,
    connect_timeout: Duration,
    infer_timeout: Duration,
}

impl<B: InferenceBackend> BackendClient<B> {
    pub fn new(backend: B, config: &BackendConfig) -> Self {
        Self::with_timeouts(backend, config.connect_timeout(), config.timeout())
    }

    pub fn with_timeouts(backend: B, connect_timeout: Duration, infer_timeout: Duration) -> Self {
        Self {
            backend,
            handle: OnceCell::new(),
            connect_timeout,
            infer_timeout,
        }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    /// Get the cached handle, connecting first if needed.
    ///
    /// A failed connect leaves nothing cached, so a later call may try again.
    pub async fn connect(&self) -> Result<Arc<B::Handle>> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                info!("Connecting to inference backend {}", self.backend.name());
                let start = Instant::now();

                let handle = with_deadline("backend connect", self.connect_timeout, self.backend.connect())
                    .await
                    .inspect_err(|e| warn!("Backend connect failed: {}", e))?;

                info!("Backend {} connected in {:?}", self.backend.name(), start.elapsed());
                Ok::<_, TryOnError>(Arc::new(handle))
            })
            .await?;

        Ok(handle.clone())
    }

    /// Run inference and reduce the backend's answer to its first reference
    pub async fn infer(
        &self,
        handle: &B::Handle,
        person_image: &Path,
        garment_image: &Path,
        seed: u64,
    ) -> Result<ResultRef> {
        let start = Instant::now();
        let result = with_deadline(
            "inference",
            self.infer_timeout,
            self.backend.infer(handle, person_image, garment_image, seed),
        )
        .await?;
        debug!("Inference finished in {:?}: {:?}", start.elapsed(), result);

        result.into_first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::engine::result::InferenceResult;

    struct CountingBackend {
        connects: Arc<AtomicUsize>,
        fail_first: bool,
        connect_delay: Duration,
        result: InferenceResult,
    }

    impl CountingBackend {
        fn new(result: InferenceResult) -> Self {
            Self {
                connects: Arc::new(AtomicUsize::new(0)),
                fail_first: false,
                connect_delay: Duration::from_millis(20),
                result,
            }
        }
    }

    #[async_trait]
    impl InferenceBackend for CountingBackend {
        type Handle = usize;

        fn name(&self) -> &str {
            "counting"
        }

        async fn connect(&self) -> Result<usize> {
            let attempt = self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.connect_delay).await;
            if self.fail_first && attempt == 0 {
                return Err(TryOnError::BackendUnreachable("refused".into()));
            }
            Ok(attempt)
        }

        async fn infer(&self, _: &usize, _: &Path, _: &Path, _: u64) -> Result<InferenceResult> {
            Ok(self.result.clone())
        }
    }

    fn client(backend: CountingBackend) -> Arc<BackendClient<CountingBackend>> {
        Arc::new(BackendClient::with_timeouts(
            backend,
            Duration::from_secs(5),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_concurrent_first_connects_once() {
        let backend = CountingBackend::new(InferenceResult::Single("/tmp/out.png".into()));
        let connects = backend.connects.clone();
        let client = client(backend);
        assert!(!client.is_connected());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.connect().await.map(|h| *h) })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 0);
        }
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(client.is_connected());

        client.connect().await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_is_retried_later() {
        let mut backend = CountingBackend::new(InferenceResult::Sequence(vec![]));
        backend.fail_first = true;
        let connects = backend.connects.clone();
        let client = client(backend);

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, TryOnError::BackendUnreachable(_)));
        assert!(!client.is_connected());

        assert_eq!(*client.connect().await.unwrap(), 1);
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_deadline() {
        let mut backend = CountingBackend::new(InferenceResult::Sequence(vec![]));
        backend.connect_delay = Duration::from_secs(60);
        let client = BackendClient::with_timeouts(backend, Duration::from_secs(1), Duration::from_secs(1));

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, TryOnError::DeadlineExceeded { operation: "backend connect", .. }));
    }

    #[tokio::test]
    async fn test_infer_normalizes_sequence() {
        let backend = CountingBackend::new(InferenceResult::Sequence(vec![
            "https://cdn/first.png".into(),
            "https://cdn/second.png".into(),
        ]));
        let client = client(backend);
        let handle = client.connect().await.unwrap();

        let first = client
            .infer(&handle, Path::new("a.jpg"), Path::new("b.jpg"), 42)
            .await
            .unwrap();
        assert_eq!(first.as_str(), "https://cdn/first.png");
    }

    #[tokio::test]
    async fn test_infer_empty_sequence_fails() {
        let client = client(CountingBackend::new(InferenceResult::Sequence(vec![])));
        let handle = client.connect().await.unwrap();

        let err = client
            .infer(&handle, Path::new("a.jpg"), Path::new("b.jpg"), 42)
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::InferenceFailed(_)));
    }
}
