//! Explicit waits.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default interval between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Probe until it yields `Some`, or until `timeout` elapses.
///
/// The probe always runs at least once, and once more at the deadline, so a
/// zero timeout is a single immediate check. Probe errors end the wait.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn test_returns_as_soon_as_probe_succeeds() {
        let calls = Cell::new(0);
        let start = Instant::now();

        let found = poll_until(Duration::from_secs(10), Duration::from_millis(500), || {
            calls.set(calls.get() + 1);
            let ready = calls.get() == 3;
            async move { Ok::<_, crate::error::BrowserError>(ready.then_some("ready")) }
        })
        .await
        .expect("probe never errors");

        assert_eq!(found, Some("ready"));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_deadline() {
        let calls = Cell::new(0);
        let start = Instant::now();

        let found = poll_until(Duration::from_millis(1200), Duration::from_millis(500), || {
            calls.set(calls.get() + 1);
            async { Ok::<_, crate::error::BrowserError>(None::<()>) }
        })
        .await
        .expect("probe never errors");

        assert!(found.is_none());
        // Probes at 0, 500, 1000 and the 1200 deadline
        assert_eq!(calls.get(), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_probes_once() {
        let calls = Cell::new(0);
        let found = poll_until(Duration::ZERO, DEFAULT_POLL_INTERVAL, || {
            calls.set(calls.get() + 1);
            async { Ok::<_, crate::error::BrowserError>(None::<()>) }
        })
        .await
        .expect("probe never errors");

        assert!(found.is_none());
        assert_eq!(calls.get(), 1);
    }
}
