//! Canonical structured event names used across `echo-mesh`.

// Builder and deployment events.
pub const DEPLOY_START: &str = "deploy_start";
pub const DEPLOY_OK: &str = "deploy_ok";
pub const DEPLOY_FAILED: &str = "deploy_failed";
pub const BUILD_CONVERGED: &str = "build_converged";
pub const BUILD_FAILED: &str = "build_failed";

// Convergence probing events.
pub const PROBE_PAIR_OK: &str = "probe_pair_ok";
pub const PROBE_PAIR_RETRY: &str = "probe_pair_retry";
pub const PROBE_PAIR_TIMEOUT: &str = "probe_pair_timeout";

// Call and retry events.
pub const CALL_ATTEMPT: &str = "call_attempt";
pub const CALL_OK: &str = "call_ok";
pub const CALL_FAILED: &str = "call_failed";
pub const CALL_RETRY_SLEEP: &str = "call_retry_sleep";
pub const CALL_RETRY_EXHAUSTED: &str = "call_retry_exhausted";
pub const CALL_PERMANENT_ABORT: &str = "call_permanent_abort";

// Sidecar poll events.
pub const POLL_FETCH_FAILED: &str = "poll_fetch_failed";
pub const POLL_REJECTED_RETRY: &str = "poll_rejected_retry";
pub const POLL_ACCEPTED: &str = "poll_accepted";
pub const POLL_PREDICATE_ABORT: &str = "poll_predicate_abort";
pub const POLL_TIMEOUT: &str = "poll_timeout";

// Instance lifecycle events.
pub const RESTART_START: &str = "restart_start";
pub const RESTART_OK: &str = "restart_ok";
pub const RESTART_FAILED: &str = "restart_failed";
