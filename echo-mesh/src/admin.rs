//! Proxy admin surface: collaborator trait and read-only snapshot schema.
//!
//! The snapshot types belong to the proxy, not to this harness. They are
//! decoded with `serde`, inspected, and never mutated or re-serialized;
//! structured payloads stay as [`serde_json::Value`].

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state reported by the proxy server.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ServerState {
    Live,
    Draining,
    PreInitializing,
    Initializing,
}

/// Version and liveness summary of one proxy instance.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ServerInfo {
    pub version: String,
    pub state: ServerState,
    pub uptime_secs: u64,
}

/// Full configuration dump of one proxy instance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ConfigDump {
    pub configs: Vec<serde_json::Value>,
}

/// Upstream cluster state of one proxy instance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Clusters {
    pub cluster_statuses: Vec<serde_json::Value>,
}

/// Listener state of one proxy instance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Listeners {
    pub listener_statuses: Vec<serde_json::Value>,
}

/// One sampled value with its label set.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MetricSample {
    pub labels: HashMap<String, String>,
    pub value: f64,
}

/// All samples of one named metric.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub samples: Vec<MetricSample>,
}

/// Metric name to family mapping returned by a stats fetch.
pub type MetricsSnapshot = HashMap<String, MetricFamily>;

/// Admin API of one workload's attached proxy.
///
/// Implementations own transport and decoding; every method is one
/// synchronous fetch returning the decoded structure or a [`FetchError`].
#[async_trait]
pub trait ProxyAdmin: Send + Sync {
    async fn server_info(&self) -> Result<ServerInfo, FetchError>;
    async fn config_dump(&self) -> Result<ConfigDump, FetchError>;
    async fn clusters(&self) -> Result<Clusters, FetchError>;
    async fn listeners(&self) -> Result<Listeners, FetchError>;
    async fn stats(&self) -> Result<MetricsSnapshot, FetchError>;

    /// Proxy container logs.
    async fn logs(&self) -> Result<String, FetchError>;
}
