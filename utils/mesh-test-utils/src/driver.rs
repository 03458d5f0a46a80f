use crate::admin::FakeProxyAdmin;
use crate::network::{EchoNetwork, FakeEchoApp};
use async_trait::async_trait;
use echo_mesh::{
    ClusterDriver, Deployment, DeploymentError, ServiceConfig, Sidecar, Workload,
};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cluster backend that materializes services onto an [`EchoNetwork`].
///
/// Each deploy registers the service address (and every replica address)
/// as routable hosts, optionally after a readiness delay so builds have
/// something real to converge on. Restarts produce a fresh pod generation
/// with new pod names and addresses.
pub struct FakeClusterDriver {
    name: String,
    network: Arc<EchoNetwork>,
    replicas: usize,
    with_sidecars: bool,
    readiness_delay: Duration,
    generation: AtomicU64,
    fail_next_deploys: AtomicU32,
}

impl FakeClusterDriver {
    pub fn new(name: &str, network: Arc<EchoNetwork>) -> Self {
        Self {
            name: name.to_string(),
            network,
            replicas: 1,
            with_sidecars: false,
            readiness_delay: Duration::ZERO,
            generation: AtomicU64::new(0),
            fail_next_deploys: AtomicU32::new(0),
        }
    }

    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Attaches a [`FakeProxyAdmin`] backed sidecar to every workload.
    pub fn with_sidecars(mut self) -> Self {
        self.with_sidecars = true;
        self
    }

    /// Deployed hosts stay unreachable for `delay` after each deploy.
    pub fn with_readiness_delay(mut self, delay: Duration) -> Self {
        self.readiness_delay = delay;
        self
    }

    /// The next `count` deploy or restart calls fail.
    pub fn fail_next_deploys(&self, count: u32) {
        self.fail_next_deploys.store(count, Ordering::SeqCst);
    }

    /// How many pod generations this driver has produced.
    pub fn generations(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn materialize(&self, config: &ServiceConfig) -> Result<Deployment, DeploymentError> {
        let injected = self
            .fail_next_deploys
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(DeploymentError::MaterializeFailed {
                service: config.fqdn(),
                cluster: self.name.clone(),
                reason: "injected deploy failure".to_string(),
            });
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let service_address = format!("{}.{}.svc", config.fqdn(), self.name);

        let mut workloads = Vec::with_capacity(self.replicas);
        for replica in 0..self.replicas {
            let pod_name = format!("{}-v{generation}-{replica}", config.service);
            let address = format!("{pod_name}.{}.pod", self.name);
            self.network
                .register_host_after(&address, self.readiness_delay);

            let sidecar = self.with_sidecars.then(|| {
                let node_id = format!(
                    "sidecar~{address}~{pod_name}.{nsp}~{nsp}.svc",
                    nsp = config.namespace
                );
                Sidecar::new(&node_id, Arc::new(FakeProxyAdmin::new()))
            });

            workloads.push(Workload::new(
                &pod_name,
                &address,
                config.ports.iter().map(Into::into).collect(),
                Arc::new(FakeEchoApp::new(
                    &config.fqdn(),
                    &pod_name,
                    Arc::clone(&self.network),
                )),
                sidecar,
            ));
        }

        let address = if config.headless {
            String::new()
        } else {
            self.network
                .register_host_after(&service_address, self.readiness_delay);
            service_address
        };

        debug!(
            cluster = %self.name,
            service = %config.fqdn(),
            generation,
            replicas = workloads.len(),
            "materialized fake deployment"
        );
        Ok(Deployment { address, workloads })
    }
}

#[async_trait]
impl ClusterDriver for FakeClusterDriver {
    fn cluster_name(&self) -> &str {
        &self.name
    }

    async fn deploy(&self, config: &ServiceConfig) -> Result<Deployment, DeploymentError> {
        self.materialize(config)
    }

    async fn restart(&self, config: &ServiceConfig) -> Result<Deployment, DeploymentError> {
        self.materialize(config)
    }
}
