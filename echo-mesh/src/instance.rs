//! Bound handles to deployed services: `EchoInstance` and `Instances`.

use crate::caller::{CallOptions, CallResponses, Caller};
use crate::config::ServiceConfig;
use crate::driver::{Cluster, Deployment};
use crate::error::{CallError, DeploymentError};
use crate::observability::events;
use crate::workload::Workload;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Bound handle to one deployed logical echo service.
///
/// Cheap to clone; all clones observe the same workload set.
#[derive(Clone)]
pub struct EchoInstance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    config: ServiceConfig,
    cluster: Cluster,
    /// Service-level address; empty for headless services.
    address: String,
    workloads: RwLock<Vec<Workload>>,
}

impl EchoInstance {
    pub(crate) fn new(config: ServiceConfig, cluster: Cluster, deployment: Deployment) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                config,
                cluster,
                address: deployment.address,
                workloads: RwLock::new(deployment.workloads),
            }),
        }
    }

    /// The originating configuration of this instance.
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn cluster_name(&self) -> &str {
        self.inner.cluster.name()
    }

    /// Service address. Empty for headless services.
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// The current workload set.
    ///
    /// Never returns an empty set with `Ok`; an instance whose replicas have
    /// all gone away reports [`DeploymentError::NoWorkloads`].
    pub async fn workloads(&self) -> Result<Vec<Workload>, DeploymentError> {
        let workloads = self.inner.workloads.read().await;
        if workloads.is_empty() {
            return Err(DeploymentError::NoWorkloads {
                service: self.inner.config.fqdn(),
                cluster: self.inner.cluster.name().to_string(),
            });
        }
        Ok(workloads.clone())
    }

    /// Replaces every workload of this instance.
    ///
    /// This is a full invalidation barrier: `Workload` values obtained
    /// before a restart refer to replicas that no longer exist, and callers
    /// must not race in-flight calls or config waits against it.
    pub async fn restart(&self) -> Result<(), DeploymentError> {
        let service = self.inner.config.fqdn();
        debug!(event = events::RESTART_START, service = %service);

        let deployment = match self
            .inner
            .cluster
            .driver()
            .restart(&self.inner.config)
            .await
        {
            Ok(deployment) => deployment,
            Err(err) => {
                warn!(event = events::RESTART_FAILED, service = %service, err = %err);
                return Err(err);
            }
        };
        if deployment.workloads.is_empty() {
            warn!(event = events::RESTART_FAILED, service = %service, err = "no workloads");
            return Err(DeploymentError::NoWorkloads {
                service,
                cluster: self.inner.cluster.name().to_string(),
            });
        }

        *self.inner.workloads.write().await = deployment.workloads;
        debug!(event = events::RESTART_OK, service = %service);
        Ok(())
    }

    /// Address other instances should dial to reach this one: the service
    /// address, or the first replica's address when headless.
    pub(crate) async fn dial_address(&self) -> Result<String, CallError> {
        if !self.inner.address.is_empty() {
            return Ok(self.inner.address.clone());
        }
        let workloads = self.inner.workloads.read().await;
        workloads
            .first()
            .map(|workload| workload.address().to_string())
            .ok_or_else(|| CallError::EmptyTarget {
                detail: format!("headless service {} has no workloads", self.inner.config.fqdn()),
            })
    }

    async fn source_workload(&self) -> Result<Workload, CallError> {
        let workloads = self.inner.workloads.read().await;
        workloads
            .first()
            .cloned()
            .ok_or_else(|| CallError::EmptyTarget {
                detail: format!("service {} has no workloads", self.inner.config.fqdn()),
            })
    }
}

#[async_trait]
impl Caller for EchoInstance {
    async fn call(&self, options: &CallOptions) -> Result<CallResponses, CallError> {
        let request = options.forward_request().await?;
        let target = request.target.clone();
        let source = self.source_workload().await?;

        let responses = source.forward_echo(&request).await?;
        if let Some(bad) = responses.iter().find(|response| !response.is_ok()) {
            return Err(CallError::ErrorStatus {
                target,
                status: bad.status,
            });
        }
        Ok(CallResponses::new(responses))
    }

    fn as_instance(&self) -> Option<EchoInstance> {
        Some(self.clone())
    }
}

impl std::fmt::Debug for EchoInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoInstance")
            .field("service", &self.inner.config.fqdn())
            .field("cluster", &self.inner.cluster.name())
            .field("address", &self.inner.address)
            .finish_non_exhaustive()
    }
}

/// Homogeneous collection of built instances.
#[derive(Clone, Debug, Default)]
pub struct Instances {
    items: Vec<EchoInstance>,
}

impl Instances {
    pub fn new(items: Vec<EchoInstance>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EchoInstance> {
        self.items.iter()
    }

    /// First instance whose service name matches.
    pub fn service(&self, service: &str) -> Option<&EchoInstance> {
        self.items
            .iter()
            .find(|instance| instance.config().service == service)
    }
}

impl IntoIterator for Instances {
    type Item = EchoInstance;
    type IntoIter = std::vec::IntoIter<EchoInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Instances {
    type Item = &'a EchoInstance;
    type IntoIter = std::slice::Iter<'a, EchoInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[async_trait]
impl Caller for Instances {
    /// Delegates to the first instance in the collection.
    async fn call(&self, options: &CallOptions) -> Result<CallResponses, CallError> {
        let first = self.items.first().ok_or_else(|| CallError::EmptyTarget {
            detail: "empty instance collection".to_string(),
        })?;
        first.call(options).await
    }

    /// A collection is never concretely a single instance.
    fn as_instance(&self) -> Option<EchoInstance> {
        None
    }
}
