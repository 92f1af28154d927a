//! Bounded re-execution of writes that lose a race with a concurrent
//! transaction.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::DbError;

const MAX_ATTEMPTS: u32 = 16;
const BACKOFF_STEP: Duration = Duration::from_millis(5);

/// Run `op` until it succeeds or fails with an error that is not a
/// transaction conflict. Each attempt must re-read whatever it derives
/// its write from.
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &'static str,
    mut op: F,
) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let mut attempt = 1;

    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                debug!(operation, attempt, error = %e, "Write conflict, retrying");
                tokio::time::sleep(BACKOFF_STEP * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(
                        operation,
                        attempts = attempt,
                        error = %e,
                        "Giving up after repeated write conflicts"
                    );
                }
                return Err(e);
            }
            ok => return ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn conflict() -> DbError {
        DbError::Query("Transaction conflict: Write conflict, retry the transaction".into())
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let value = with_retry("test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_returned_at_once() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = with_retry("test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(DbError::not_found("idea", "x"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = with_retry("test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(conflict())
        })
        .await
        .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[test]
    fn index_violations_are_retryable() {
        let err = DbError::Query(
            "Database index `idea_tenant_number` already contains [\"t\", 3]".into(),
        );
        assert!(err.is_retryable());
        assert!(!DbError::Decode("bad".into()).is_retryable());
    }
}
