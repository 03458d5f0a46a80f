//! Error taxonomy for topology builds, calls, and admin fetches.
//!
//! Transient kinds ([`CallError`] with `is_transient()`, [`FetchError`]) are
//! contained inside their retry loops; only the terminal wrappers
//! ([`RetryExhaustedError`], [`TimeoutError`], the build errors) surface to
//! callers.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Fatal failure to materialize a registered config. Never retried.
#[derive(Debug)]
pub enum DeploymentError {
    /// The config failed validation before any deployment was attempted.
    InvalidConfig(ConfigError),
    /// The cluster driver could not bring the service up.
    MaterializeFailed {
        service: String,
        cluster: String,
        reason: String,
    },
    /// A deployment reported success with zero live replicas.
    NoWorkloads { service: String, cluster: String },
    /// The registration had no cluster in scope when the builder ran.
    NoClusters { service: String },
}

impl Display for DeploymentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentError::InvalidConfig(err) => write!(f, "invalid service config: {err}"),
            DeploymentError::MaterializeFailed {
                service,
                cluster,
                reason,
            } => write!(
                f,
                "failed to deploy service {service} to cluster {cluster}: {reason}"
            ),
            DeploymentError::NoWorkloads { service, cluster } => write!(
                f,
                "service {service} in cluster {cluster} has no live workloads"
            ),
            DeploymentError::NoClusters { service } => {
                write!(f, "service {service} was registered with no cluster in scope")
            }
        }
    }
}

impl Error for DeploymentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DeploymentError::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

/// Fatal: the deployed mesh never reached full pairwise reachability.
#[derive(Debug)]
pub struct ConvergenceTimeoutError {
    pub waited: Duration,
    /// (source, target) service names still failing their probe at deadline.
    pub unready_pairs: Vec<(String, String)>,
}

impl Display for ConvergenceTimeoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pairs = self
            .unready_pairs
            .iter()
            .map(|(from, to)| format!("{from}->{to}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "mesh did not converge within {:?}; unready pairs: [{pairs}]",
            self.waited
        )
    }
}

impl Error for ConvergenceTimeoutError {}

/// Either way a topology build can fail.
#[derive(Debug)]
pub enum BuildError {
    Deployment(DeploymentError),
    Convergence(ConvergenceTimeoutError),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Deployment(err) => write!(f, "topology deployment failed: {err}"),
            BuildError::Convergence(err) => write!(f, "topology convergence failed: {err}"),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::Deployment(err) => Some(err),
            BuildError::Convergence(err) => Some(err),
        }
    }
}

impl From<DeploymentError> for BuildError {
    fn from(err: DeploymentError) -> Self {
        BuildError::Deployment(err)
    }
}

impl From<ConvergenceTimeoutError> for BuildError {
    fn from(err: ConvergenceTimeoutError) -> Self {
        BuildError::Convergence(err)
    }
}

/// Failure of one forward-call attempt.
#[derive(Clone, Debug)]
pub enum CallError {
    /// Transport-level failure reaching the target.
    Unreachable { target: String, reason: String },
    /// One attempt ran past its per-attempt budget.
    AttemptTimeout { target: String, budget: Duration },
    /// The target answered with a non-success protocol status.
    ErrorStatus { target: String, status: u16 },
    /// The options name a port the target config does not declare.
    UnknownPort { service: String, port: String },
    /// The caller or target collection resolves to nothing callable.
    EmptyTarget { detail: String },
}

impl CallError {
    /// Whether a retry loop may reasonably re-attempt after this failure.
    ///
    /// Reachability and timeout failures are expected while config
    /// propagates; a missing port or empty target can never heal.
    pub fn is_transient(&self) -> bool {
        match self {
            CallError::Unreachable { .. }
            | CallError::AttemptTimeout { .. }
            | CallError::ErrorStatus { .. } => true,
            CallError::UnknownPort { .. } | CallError::EmptyTarget { .. } => false,
        }
    }
}

impl Display for CallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Unreachable { target, reason } => {
                write!(f, "target {target} unreachable: {reason}")
            }
            CallError::AttemptTimeout { target, budget } => {
                write!(f, "call to {target} timed out after {budget:?}")
            }
            CallError::ErrorStatus { target, status } => {
                write!(f, "target {target} answered with status {status}")
            }
            CallError::UnknownPort { service, port } => {
                write!(f, "service {service} declares no port named '{port}'")
            }
            CallError::EmptyTarget { detail } => write!(f, "nothing to call: {detail}"),
        }
    }
}

impl Error for CallError {}

/// Terminal wrapper produced when a retried call never succeeded.
#[derive(Debug)]
pub struct RetryExhaustedError {
    /// Attempts actually performed, including the final one.
    pub attempts: u32,
    pub last: CallError,
}

impl Display for RetryExhaustedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "call failed after {} attempt(s); last error: {}",
            self.attempts, self.last
        )
    }
}

impl Error for RetryExhaustedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.last)
    }
}

/// Failure of one fetch against a proxy admin endpoint.
///
/// Retryable inside [`wait_for_config`][crate::sidecar::Sidecar::wait_for_config];
/// terminal when returned by a direct accessor.
#[derive(Clone, Debug)]
pub struct FetchError {
    pub endpoint: &'static str,
    pub reason: String,
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch of {} failed: {}", self.endpoint, self.reason)
    }
}

impl Error for FetchError {}

/// Terminal: a poll budget was exhausted while the predicate never accepted.
#[derive(Debug)]
pub struct TimeoutError {
    pub waited: Duration,
    /// Fetches performed before giving up, successful or not.
    pub attempts: u32,
    /// Last fetch failure observed, when the final state was a fetch error.
    pub last_fetch_error: Option<FetchError>,
}

impl Display for TimeoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "poll budget exhausted after {:?} ({} fetch attempt(s))",
            self.waited, self.attempts
        )?;
        if let Some(fetch_error) = &self.last_fetch_error {
            write!(f, "; last fetch failure: {fetch_error}")?;
        }
        Ok(())
    }
}

impl Error for TimeoutError {}
