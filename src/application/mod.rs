//! Application services orchestrating the domain over the repository ports.
//!
//! Each service holds `Arc` handles to the ports it needs and carries no
//! mutable state of its own, so concurrent invocations for different
//! subjects are independent.

pub mod engine;
pub mod lifecycle;
pub mod matching;
pub mod settlement;

use crate::error::{EngineError, Result};
use std::future::Future;
use std::time::Duration;

/// Bounds a repository port call by the configured deadline.
///
/// A timed-out call writes nothing (the future is dropped before any commit
/// acknowledgement) and surfaces as a retryable internal error.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::retryable(format!(
            "repository call `{op}` exceeded {}ms deadline",
            deadline.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_expiry_is_retryable() {
        let result: Result<()> = with_deadline(Duration::from_millis(5), "slow.op", async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let result = with_deadline(Duration::from_secs(1), "fast.op", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
