//! Generic accept-predicate polling primitive.
//!
//! One reusable state machine (`Polling` until accepted, rejected-retry on a
//! false predicate, failed on predicate error or budget exhaustion) backs
//! every "wait for an externally-owned control plane to catch up" need in
//! the harness, [`Sidecar::wait_for_config`][crate::sidecar::Sidecar::wait_for_config]
//! first among them.

use crate::error::{FetchError, TimeoutError};
use crate::observability::events;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Interval/budget pair driving one polling loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Terminal outcome of a poll that never accepted.
#[derive(Debug)]
pub enum WaitError<E> {
    /// Budget exhausted while still polling or rejected-retry.
    Timeout(TimeoutError),
    /// The accept predicate aborted early with its own error.
    Rejected(E),
}

impl<E: Display> Display for WaitError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Timeout(err) => write!(f, "{err}"),
            WaitError::Rejected(err) => write!(f, "accept predicate aborted the poll: {err}"),
        }
    }
}

impl<E: Error + 'static> Error for WaitError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WaitError::Timeout(err) => Some(err),
            WaitError::Rejected(err) => Some(err),
        }
    }
}

/// Polls `fetch` until `accept` returns `Ok(true)` for a snapshot.
///
/// Fetch failures are retryable and stay inside the loop; an
/// `accept` error aborts immediately without consuming the remaining
/// budget. Each fetch and each sleep is clamped to the remaining budget so
/// a deadline is honored promptly rather than overshot by a hung fetch or
/// by one extra interval.
pub async fn poll_until<T, E, Fetch, Fut, Accept>(
    policy: &PollPolicy,
    mut fetch: Fetch,
    mut accept: Accept,
) -> Result<T, WaitError<E>>
where
    Fetch: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    Accept: FnMut(&T) -> Result<bool, E>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempts: u32 = 0;
    let mut last_fetch_error: Option<FetchError> = None;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, fetch()).await {
            Err(_) => {
                let err = FetchError {
                    endpoint: "fetch",
                    reason: "still pending at the poll deadline".to_string(),
                };
                trace!(event = events::POLL_FETCH_FAILED, attempt = attempts, err = %err);
                last_fetch_error = Some(err);
            }
            Ok(Err(err)) => {
                trace!(event = events::POLL_FETCH_FAILED, attempt = attempts, err = %err);
                last_fetch_error = Some(err);
            }
            Ok(Ok(snapshot)) => {
                last_fetch_error = None;
                match accept(&snapshot) {
                    Ok(true) => {
                        debug!(event = events::POLL_ACCEPTED, attempts = attempts);
                        return Ok(snapshot);
                    }
                    Ok(false) => {
                        trace!(event = events::POLL_REJECTED_RETRY, attempt = attempts);
                    }
                    Err(err) => {
                        debug!(event = events::POLL_PREDICATE_ABORT, attempt = attempts);
                        return Err(WaitError::Rejected(err));
                    }
                }
            }
        }

        let now = Instant::now();
        if now >= deadline {
            let waited = start.elapsed();
            debug!(
                event = events::POLL_TIMEOUT,
                attempts = attempts,
                waited_ms = waited.as_millis() as u64
            );
            return Err(WaitError::Timeout(TimeoutError {
                waited,
                attempts,
                last_fetch_error,
            }));
        }
        tokio::time::sleep(policy.interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::{poll_until, PollPolicy, WaitError};
    use crate::error::FetchError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    fn quick_policy() -> PollPolicy {
        PollPolicy::default()
            .with_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn accepting_first_snapshot_polls_exactly_once() {
        let fetches = AtomicU32::new(0);

        let result = poll_until(
            &quick_policy(),
            || {
                fetches.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FetchError>(41) }
            },
            |snapshot| Ok::<_, FetchError>(*snapshot > 40),
        )
        .await;

        assert_eq!(result.unwrap(), 41);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejecting_predicate_exhausts_the_budget_not_sooner() {
        let policy = quick_policy();
        let started = Instant::now();

        let result = poll_until(
            &policy,
            || async { Ok::<_, FetchError>(0) },
            |_| Ok::<_, FetchError>(false),
        )
        .await;

        let elapsed = started.elapsed();
        match result.unwrap_err() {
            WaitError::Timeout(err) => {
                assert!(err.attempts > 1);
                assert!(err.last_fetch_error.is_none());
            }
            WaitError::Rejected(_) => panic!("expected timeout"),
        }
        assert!(elapsed >= policy.timeout);
        // Clamped sleep keeps overshoot well under one extra interval cycle.
        assert!(elapsed < policy.timeout + Duration::from_millis(50));
    }

    #[tokio::test]
    async fn predicate_error_aborts_immediately() {
        let fetches = AtomicU32::new(0);

        let result: Result<i32, _> = poll_until(
            &quick_policy(),
            || {
                fetches.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FetchError>(0) }
            },
            |_| Err("wrong cluster entirely".to_string()),
        )
        .await;

        match result.unwrap_err() {
            WaitError::Rejected(message) => assert_eq!(message, "wrong cluster entirely"),
            WaitError::Timeout(_) => panic!("expected predicate abort"),
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failures_are_contained_and_reported_at_timeout() {
        let result: Result<i32, WaitError<FetchError>> = poll_until(
            &quick_policy(),
            || async {
                Err(FetchError {
                    endpoint: "config_dump",
                    reason: "connection refused".to_string(),
                })
            },
            |_| Ok(true),
        )
        .await;

        match result.unwrap_err() {
            WaitError::Timeout(err) => {
                let fetch_error = err.last_fetch_error.expect("last fetch error recorded");
                assert_eq!(fetch_error.endpoint, "config_dump");
            }
            WaitError::Rejected(_) => panic!("expected timeout"),
        }
    }

    #[tokio::test]
    async fn hung_fetch_cannot_outlive_the_budget() {
        let policy = quick_policy();
        let started = Instant::now();

        let result: Result<i32, WaitError<FetchError>> = poll_until(
            &policy,
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(0)
            },
            |_| Ok(true),
        )
        .await;

        let elapsed = started.elapsed();
        match result.unwrap_err() {
            WaitError::Timeout(err) => {
                let fetch_error = err.last_fetch_error.expect("hung fetch recorded");
                assert!(fetch_error.reason.contains("still pending"));
            }
            WaitError::Rejected(_) => panic!("expected timeout"),
        }
        assert!(elapsed < policy.timeout + Duration::from_millis(100));
    }

    #[tokio::test]
    async fn fetch_recovery_resets_the_recorded_fetch_error() {
        let fetches = AtomicU32::new(0);

        let result = poll_until(
            &quick_policy(),
            || {
                let attempt = fetches.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(FetchError {
                            endpoint: "config_dump",
                            reason: "reset".to_string(),
                        })
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |snapshot| Ok::<_, FetchError>(*snapshot >= 1),
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
