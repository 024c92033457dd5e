//! Per-call deadlines for network operations

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, TryOnError};

/// Run `future` with an upper bound on its duration.
///
/// On expiry the future is dropped, which aborts the in-flight call.
pub async fn with_deadline<T, F>(operation: &'static str, timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TryOnError::DeadlineExceeded { operation, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let value = with_deadline("noop", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_deadline_exceeded() {
        let err = with_deadline("slow call", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        match err {
            TryOnError::DeadlineExceeded { operation, timeout } => {
                assert_eq!(operation, "slow call");
                assert_eq!(timeout, Duration::from_millis(50));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
