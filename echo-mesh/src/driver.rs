//! Deployment collaborator boundary.
//!
//! How replicas are scheduled (containers, pods, processes) is owned by the
//! driver behind this trait; the harness only consumes the resulting
//! workload handles.

use crate::config::ServiceConfig;
use crate::error::DeploymentError;
use crate::workload::Workload;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of materializing one config in one cluster.
pub struct Deployment {
    /// Service-level address; empty for headless services.
    pub address: String,
    pub workloads: Vec<Workload>,
}

/// Deploys echo services into one cluster.
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    fn cluster_name(&self) -> &str;

    /// Brings the service up and returns its live replicas.
    async fn deploy(&self, config: &ServiceConfig) -> Result<Deployment, DeploymentError>;

    /// Replaces every replica of an already-deployed service.
    async fn restart(&self, config: &ServiceConfig) -> Result<Deployment, DeploymentError>;
}

/// Named handle to a cluster and its driver.
#[derive(Clone)]
pub struct Cluster {
    name: String,
    driver: Arc<dyn ClusterDriver>,
}

impl Cluster {
    pub fn new(driver: Arc<dyn ClusterDriver>) -> Self {
        Self {
            name: driver.cluster_name().to_string(),
            driver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn driver(&self) -> &Arc<dyn ClusterDriver> {
        &self.driver
    }
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
