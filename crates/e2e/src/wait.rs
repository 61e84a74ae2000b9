//! Bounded polling waits

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Poll `check` until it yields a value or `timeout` elapses.
///
/// The check always runs at least once. There is no retry beyond the
/// polling loop itself.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        if let Some(value) = check().await {
            debug!("{} ready after {} attempt(s)", what, attempts);
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(E2eError::Timeout {
                what: what.to_string(),
                seconds: timeout.as_secs(),
            });
        }

        sleep(interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_returns_first_value() {
        let calls = AtomicUsize::new(0);
        let value = poll_until("counter", Duration::from_secs(1), Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { (n >= 3).then_some(n) }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_times_out() {
        let err = poll_until::<(), _, _>(
            "#never",
            Duration::from_millis(30),
            Duration::from_millis(5),
            || async { None },
        )
        .await
        .unwrap_err();

        match err {
            E2eError::Timeout { what, .. } => assert_eq!(what, "#never"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_still_checks_once() {
        let value = poll_until("now", Duration::ZERO, Duration::from_millis(5), || async {
            Some(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
