//! Turns a backend result reference into a local transient artifact

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, TryOnError};
use crate::storage::{ScratchSpace, TransientArtifact};
use crate::utils::with_deadline;

use super::result::{ResultLocation, ResultRef};

pub struct ResultResolver {
    http: reqwest::Client,
    scratch: ScratchSpace,
    timeout: Duration,
}

impl ResultResolver {
    pub fn new(scratch: ScratchSpace, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            scratch,
            timeout,
        }
    }

    /// Download a remote result or copy a local one into a fresh artifact
    pub async fn resolve(&self, reference: &ResultRef) -> Result<TransientArtifact> {
        let artifact = self.scratch.allocate(reference.as_str())?;

        match reference.location() {
            ResultLocation::Remote(url) => {
                with_deadline("result download", self.timeout, self.download(&url, &artifact)).await?;
            }
            ResultLocation::Local(path) => {
                tokio::fs::copy(&path, artifact.path()).await.map_err(|e| {
                    if e.kind() == ErrorKind::NotFound {
                        TryOnError::ResultFetchFailed(format!("{} does not exist", path.display()))
                    } else {
                        TryOnError::ResultFetchFailed(format!("copy {}: {}", path.display(), e))
                    }
                })?;
                debug!("Copied local result {}", path.display());
            }
        }

        Ok(artifact)
    }

    async fn download(&self, url: &str, artifact: &TransientArtifact) -> Result<()> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TryOnError::ResultFetchFailed(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TryOnError::ResultFetchFailed(format!("GET {} returned {}", url, status)));
        }

        let mut file = tokio::fs::File::create(artifact.path()).await?;
        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TryOnError::ResultFetchFailed(format!("GET {}: {}", url, e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!("Downloaded result {} ({} bytes)", url, written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use tempfile::tempdir;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn resolver(dir: &std::path::Path) -> ResultResolver {
        ResultResolver::new(ScratchSpace::new(dir).unwrap(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_copies_local_result() {
        let scratch = tempdir().unwrap();
        let outputs = tempdir().unwrap();
        let source = outputs.path().join("out.png");
        std::fs::write(&source, b"result png").unwrap();

        let reference = ResultRef::Plain(source.display().to_string());
        let artifact = resolver(scratch.path()).resolve(&reference).await.unwrap();

        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"result png");
        assert!(artifact.path().starts_with(scratch.path()));
        // Backend-owned file is left alone
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_missing_local_result() {
        let scratch = tempdir().unwrap();
        let reference = ResultRef::Path {
            path: "/nonexistent/dir/out.png".to_string(),
        };

        let err = resolver(scratch.path()).resolve(&reference).await.unwrap_err();
        assert!(matches!(err, TryOnError::ResultFetchFailed(_)));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_downloads_remote_result() {
        let router = Router::new()
            .route("/file/out.png", get(|| async { "remote png" }))
            .route("/file/gone.png", get(|| async { StatusCode::NOT_FOUND }));
        let base = serve(router).await;
        let scratch = tempdir().unwrap();
        let resolver = resolver(scratch.path());

        let ok = ResultRef::Url {
            url: format!("{}/file/out.png", base),
        };
        let artifact = resolver.resolve(&ok).await.unwrap();
        assert_eq!(std::fs::read(artifact.path()).unwrap(), b"remote png");
        drop(artifact);

        let gone = ResultRef::Plain(format!("{}/file/gone.png", base));
        let err = resolver.resolve(&gone).await.unwrap_err();
        assert!(matches!(err, TryOnError::ResultFetchFailed(ref m) if m.contains("404")));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
