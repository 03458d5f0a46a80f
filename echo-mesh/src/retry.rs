//! Retry protocol for forward calls.

use crate::caller::CallResponses;
use crate::config::MeshSettings;
use crate::error::{CallError, RetryExhaustedError};
use crate::observability::events;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace};

/// Retry schedule for [`call_with_retry`][crate::caller::Caller::call_with_retry].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Budget for one attempt; overrun counts as a transient failure.
    pub attempt_timeout: Duration,
    /// Sleep between attempts.
    pub backoff: Duration,
    /// Overall budget across all attempts and backoffs. Aborts the loop
    /// promptly when reached, even with attempts remaining.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(10),
            backoff: Duration::from_secs(1),
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &MeshSettings) -> Self {
        Self {
            max_attempts: settings.retry_max_attempts,
            backoff: Duration::from_millis(settings.retry_backoff_ms),
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Re-issues `attempt` under `policy` until success or exhaustion.
///
/// Stops on first success. Transient failures consume attempts; a permanent
/// [`CallError`] ends the loop at once. Either way the terminal error is a
/// [`RetryExhaustedError`] carrying the attempts actually made and the last
/// underlying failure. `label` names the call target in timeout errors and
/// log events.
pub async fn retry_call<F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut attempt: F,
) -> Result<CallResponses, RetryExhaustedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<CallResponses, CallError>>,
{
    let start = Instant::now();
    let overall_deadline = policy.deadline.map(|budget| start + budget);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        trace!(event = events::CALL_ATTEMPT, target = label, attempt = attempts);

        let outcome = match timeout(policy.attempt_timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => Err(CallError::AttemptTimeout {
                target: label.to_string(),
                budget: policy.attempt_timeout,
            }),
        };

        let err = match outcome {
            Ok(responses) => {
                debug!(event = events::CALL_OK, target = label, attempts = attempts);
                return Ok(responses);
            }
            Err(err) => err,
        };
        trace!(event = events::CALL_FAILED, target = label, attempt = attempts, err = %err);

        if !err.is_transient() {
            debug!(event = events::CALL_PERMANENT_ABORT, target = label, err = %err);
            return Err(RetryExhaustedError {
                attempts,
                last: err,
            });
        }
        if attempts >= policy.max_attempts {
            debug!(
                event = events::CALL_RETRY_EXHAUSTED,
                target = label,
                attempts = attempts
            );
            return Err(RetryExhaustedError {
                attempts,
                last: err,
            });
        }

        match overall_deadline {
            None => {
                trace!(event = events::CALL_RETRY_SLEEP, target = label);
                tokio::time::sleep(policy.backoff).await;
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(RetryExhaustedError {
                        attempts,
                        last: err,
                    });
                }
                tokio::time::sleep(policy.backoff.min(deadline - now)).await;
                if Instant::now() >= deadline {
                    return Err(RetryExhaustedError {
                        attempts,
                        last: err,
                    });
                }
            }
        }
    }
}
