//! Caller Deadlines
//!
//! Wraps a whole gateway call (throttle wait, sends, backoff sleeps) in an
//! optional deadline. Expiry drops the inner future, so no further retries
//! are scheduled and nothing is cached for the call.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::types::{ClassifiedError, ErrorKind, QueryResult};

/// Run `future` under an optional deadline.
///
/// On expiry the error is `Timeout`, with `attempts` read at the moment the
/// deadline fired.
pub async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    future: F,
    attempts: &AtomicU32,
) -> QueryResult<T>
where
    F: Future<Output = QueryResult<T>>,
{
    let Some(limit) = deadline else {
        return future.await;
    };

    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(ClassifiedError::new(
            ErrorKind::Timeout,
            format!(
                "{}: caller deadline of {}ms elapsed",
                ErrorKind::Timeout.summary(),
                limit.as_millis()
            ),
        )
        .with_attempts(attempts.load(Ordering::Relaxed))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_without_deadline_runs_to_completion() {
        let attempts = AtomicU32::new(0);
        let result = with_deadline(
            None,
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, ClassifiedError>(7)
            },
            &attempts,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let attempts = AtomicU32::new(2);
        let result = with_deadline(
            Some(Duration::from_millis(50)),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, ClassifiedError>(7)
            },
            &attempts,
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.metadata.attempt_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_passes_through() {
        let attempts = AtomicU32::new(1);
        let result: QueryResult<()> = with_deadline(
            Some(Duration::from_secs(1)),
            async { Err(ClassifiedError::new(ErrorKind::ValidationError, "empty prompt")) },
            &attempts,
        )
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::ValidationError);
    }
}
