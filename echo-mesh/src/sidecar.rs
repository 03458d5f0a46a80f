//! Handle to the proxy attached to one workload.

use crate::admin::{Clusters, ConfigDump, Listeners, MetricsSnapshot, ProxyAdmin, ServerInfo};
use crate::error::FetchError;
use crate::wait::{poll_until, PollPolicy, WaitError};
use std::sync::Arc;

/// Per-workload interface to the workload's attached proxy.
///
/// Bound to exactly one workload's proxy for its lifetime. The node id is
/// the stable identity key the control plane knows this proxy by.
#[derive(Clone)]
pub struct Sidecar {
    node_id: String,
    admin: Arc<dyn ProxyAdmin>,
}

impl Sidecar {
    pub fn new(node_id: &str, admin: Arc<dyn ProxyAdmin>) -> Self {
        Self {
            node_id: node_id.to_string(),
            admin,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub async fn info(&self) -> Result<ServerInfo, FetchError> {
        self.admin.server_info().await
    }

    pub async fn config(&self) -> Result<ConfigDump, FetchError> {
        self.admin.config_dump().await
    }

    pub async fn clusters(&self) -> Result<Clusters, FetchError> {
        self.admin.clusters().await
    }

    pub async fn listeners(&self) -> Result<Listeners, FetchError> {
        self.admin.listeners().await
    }

    pub async fn stats(&self) -> Result<MetricsSnapshot, FetchError> {
        self.admin.stats().await
    }

    pub async fn logs(&self) -> Result<String, FetchError> {
        self.admin.logs().await
    }

    /// Polls the proxy config dump until `accept` takes it.
    ///
    /// Config propagation from the control plane has no latency bound short
    /// of the policy timeout, so fetch failures and rejected snapshots both
    /// stay in the loop; only predicate errors and budget exhaustion end it.
    /// Returns the accepted snapshot.
    pub async fn wait_for_config<A, E>(
        &self,
        accept: A,
        policy: &PollPolicy,
    ) -> Result<ConfigDump, WaitError<E>>
    where
        A: FnMut(&ConfigDump) -> Result<bool, E>,
    {
        let admin = self.admin.clone();
        poll_until(
            policy,
            move || {
                let admin = admin.clone();
                async move { admin.config_dump().await }
            },
            accept,
        )
        .await
    }
}

impl std::fmt::Debug for Sidecar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sidecar")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}
