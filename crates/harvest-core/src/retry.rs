//! Retry-with-backoff execution with an attempt-rollback hook.
//!
//! A [`RetryPolicy`] decides how many attempts an operation gets and how long
//! to wait between them. A [`RetryExecutor`] runs the operation, calls the
//! failure hook after every failed attempt (callers use it to roll partially
//! accumulated state back to its pre-attempt snapshot), sleeps, and tries
//! again. Attempts never overlap.

use crate::error::RetryExhausted;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
    increment_factor: Option<f64>,
    max_interval: Option<Duration>,
}

impl RetryPolicy {
    /// Wait the same `interval` before every retry.
    ///
    /// `max_attempts` counts the first attempt and is clamped to at least 1.
    #[must_use]
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            increment_factor: None,
            max_interval: None,
        }
    }

    /// Start at `interval` and multiply by `factor` on each further retry,
    /// never exceeding `max_interval` when one is given.
    ///
    /// Factors below 1.0 are treated as 1.0.
    #[must_use]
    pub fn incremental(
        max_attempts: u32,
        interval: Duration,
        factor: f64,
        max_interval: Option<Duration>,
    ) -> Self {
        let factor = if factor.is_finite() { factor.max(1.0) } else { 1.0 };
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            increment_factor: Some(factor),
            max_interval,
        }
    }

    /// Total attempts including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Successive waits between attempts.
    ///
    /// The iterator is unbounded; the executor takes one value per retry.
    #[must_use]
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.cap(self.interval),
            factor: self.increment_factor,
            max_interval: self.max_interval,
        }
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_interval {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(15))
    }
}

/// Backoff sequence produced by [`RetryPolicy::delays`].
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    factor: Option<f64>,
    max_interval: Option<Duration>,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        if let Some(factor) = self.factor {
            let grown = Duration::try_from_secs_f64(current.as_secs_f64() * factor)
                .unwrap_or(Duration::MAX);
            self.next = match self.max_interval {
                Some(max) => grown.min(max),
                None => grown,
            };
        }
        Some(current)
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor for the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy this executor applies.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run a blocking operation, sleeping the calling thread between attempts.
    ///
    /// `on_attempt_failed` runs after every failed attempt, before any wait.
    ///
    /// # Errors
    /// Returns [`RetryExhausted`] carrying the last error once every attempt
    /// has failed.
    pub fn execute<T, E, F, H>(
        &self,
        mut operation: F,
        mut on_attempt_failed: H,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Result<T, E>,
        H: FnMut(&E),
        E: std::error::Error + 'static,
    {
        let mut delays = self.policy.delays();
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    on_attempt_failed(&e);
                    match self.next_delay(attempt, &e, &mut delays) {
                        Some(delay) => std::thread::sleep(delay),
                        None => return Err(RetryExhausted { attempts: attempt, source: e }),
                    }
                }
            }
            attempt += 1;
        }
    }

    /// Run an async operation, suspending between attempts.
    ///
    /// Same semantics as [`execute`](Self::execute); the backoff wait does not
    /// block the worker thread.
    pub async fn execute_async<T, E, F, Fut, H>(
        &self,
        mut operation: F,
        mut on_attempt_failed: H,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(&E),
        E: std::error::Error + 'static,
    {
        let mut delays = self.policy.delays();
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    on_attempt_failed(&e);
                    match self.next_delay(attempt, &e, &mut delays) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(RetryExhausted { attempts: attempt, source: e }),
                    }
                }
            }
            attempt += 1;
        }
    }

    /// Run an async operation that needs exclusive access to `ctx`.
    ///
    /// Both the operation and the failure hook borrow `ctx` mutably, one at a
    /// time, so the hook can restore whatever the failed attempt appended.
    pub async fn execute_async_with<C, T, E, F, H>(
        &self,
        ctx: &mut C,
        mut operation: F,
        mut on_attempt_failed: H,
    ) -> Result<T, RetryExhausted<E>>
    where
        C: ?Sized,
        F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, E>>,
        H: FnMut(&mut C, &E),
        E: std::error::Error + 'static,
    {
        let mut delays = self.policy.delays();
        let mut attempt = 1;
        loop {
            match operation(ctx).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    on_attempt_failed(ctx, &e);
                    match self.next_delay(attempt, &e, &mut delays) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(RetryExhausted { attempts: attempt, source: e }),
                    }
                }
            }
            attempt += 1;
        }
    }

    /// Delay before the next attempt, or `None` once attempts are used up.
    fn next_delay<E: std::error::Error>(
        &self,
        attempt: u32,
        error: &E,
        delays: &mut Delays,
    ) -> Option<Duration> {
        if attempt >= self.policy.max_attempts {
            debug!(attempt, error = %error, "retry attempts exhausted");
            return None;
        }

        let delay = delays.next().unwrap_or(self.policy.interval);
        warn!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "attempt failed, retrying"
        );
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::cell::Cell;

    #[derive(Debug, thiserror::Error, PartialEq, Eq)]
    #[error("flaky failure #{0}")]
    struct Flaky(u32);

    #[test]
    fn test_incremental_delays_are_capped() {
        let policy = RetryPolicy::incremental(
            6,
            Duration::from_secs(1),
            2.0,
            Some(Duration::from_secs(5)),
        );
        let waits: Vec<u64> = policy.delays().take(5).map(|d| d.as_secs()).collect();
        assert_eq!(waits, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn test_fixed_delays_are_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(15));
        assert!(policy.delays().take(4).all(|d| d == Duration::from_secs(15)));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_blocking_execute_succeeds_on_third_attempt() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(3, Duration::ZERO));
        let calls = Cell::new(0);
        let rollbacks = Cell::new(0);

        let result = executor.execute(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(Flaky(calls.get()))
                } else {
                    Ok("done")
                }
            },
            |_| rollbacks.set(rollbacks.get() + 1),
        );

        assert_eq!(result.expect("third attempt succeeds"), "done");
        assert_eq!(calls.get(), 3);
        assert_eq!(rollbacks.get(), 2);
    }

    #[test]
    fn test_blocking_execute_exhausts() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(3, Duration::ZERO));
        let calls = Cell::new(0);

        let err = executor
            .execute(
                || -> Result<(), Flaky> {
                    calls.set(calls.get() + 1);
                    Err(Flaky(calls.get()))
                },
                |_| {},
            )
            .expect_err("always fails");

        assert_eq!(calls.get(), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.source, Flaky(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_execute_sleeps_between_attempts_only() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(3, Duration::from_secs(15)));
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();

        let result = executor
            .execute_async(
                || {
                    calls.set(calls.get() + 1);
                    let current = calls.get();
                    async move {
                        if current < 3 {
                            Err(Flaky(current))
                        } else {
                            Ok(current)
                        }
                    }
                },
                |_| {},
            )
            .await;

        assert_eq!(result.expect("succeeds"), 3);
        assert_eq!(calls.get(), 3);
        // Two backoff sleeps of 15s each
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_execute_exhaustion_skips_final_sleep() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(3, Duration::from_secs(15)));
        let calls = Cell::new(0);
        let start = tokio::time::Instant::now();

        let err = executor
            .execute_async(
                || {
                    calls.set(calls.get() + 1);
                    let current = calls.get();
                    async move { Err::<(), _>(Flaky(current)) }
                },
                |_| {},
            )
            .await
            .expect_err("always fails");

        assert_eq!(err.attempts, 3);
        assert_eq!(calls.get(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    struct Accumulator {
        rows: Vec<u32>,
        checkpoint: usize,
        attempt: u32,
    }

    impl Accumulator {
        async fn append_two(&mut self) -> Result<(), Flaky> {
            self.attempt += 1;
            self.rows.push(self.attempt);
            tokio::task::yield_now().await;
            if self.attempt < 2 {
                return Err(Flaky(self.attempt));
            }
            self.rows.push(self.attempt * 10);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_with_rolls_back_failed_attempt() {
        let executor = RetryExecutor::new(RetryPolicy::fixed(3, Duration::from_secs(1)));
        let mut acc = Accumulator {
            rows: vec![7],
            checkpoint: 1,
            attempt: 0,
        };

        executor
            .execute_async_with(
                &mut acc,
                |acc| acc.append_two().boxed(),
                |acc, _| {
                    let keep = acc.checkpoint;
                    acc.rows.truncate(keep);
                },
            )
            .await
            .expect("second attempt succeeds");

        // The partial row from attempt 1 is gone
        assert_eq!(acc.rows, vec![7, 2, 20]);
    }
}
