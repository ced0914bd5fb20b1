//! Bounded retry for external requests

use std::future::Future;
use std::time::Duration;
use tracing::warn;
use crate::NavError;

/// Run `op` up to `max_attempts` times, retrying only transient errors.
pub async fn retry_transient<T, F, Fut>(
    what: &str,
    max_attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, NavError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NavError>>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_transient("route", 3, Duration::from_secs(1), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(NavError::Http { status: 503, body: String::new() })
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient("route", 2, Duration::from_secs(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NavError::Http { status: 500, body: String::new() })
        })
        .await;

        assert!(matches!(result, Err(NavError::Http { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient("route", 5, Duration::from_secs(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(NavError::NoRoute)
        })
        .await;

        assert!(matches!(result, Err(NavError::NoRoute)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
