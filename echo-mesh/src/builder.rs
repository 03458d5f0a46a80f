//! Topology construction and mesh convergence.

use crate::caller::{CallOptions, Caller};
use crate::config::{MeshSettings, ServiceConfig};
use crate::driver::Cluster;
use crate::error::{BuildError, ConvergenceTimeoutError, DeploymentError};
use crate::failer::{or_fail, Failer};
use crate::instance::{EchoInstance, Instances};
use crate::observability::{events, fields};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, OnceLock};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Write-once slot bound to a built instance.
///
/// Hand a clone to [`TopologyBuilder::with`] before `build`, read it after;
/// the slot stays empty if the build fails.
#[derive(Clone, Debug, Default)]
pub struct InstanceRef {
    slot: Arc<OnceLock<EchoInstance>>,
}

impl InstanceRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bound instance, once `build` has succeeded.
    pub fn get(&self) -> Option<EchoInstance> {
        self.slot.get().cloned()
    }

    fn bind(&self, instance: EchoInstance) {
        // A slot reused across builds keeps its first binding.
        let _ = self.slot.set(instance);
    }
}

struct Registration {
    config: ServiceConfig,
    slot: Option<InstanceRef>,
    clusters: Vec<Cluster>,
}

/// Declarative builder for an echo topology.
///
/// Accumulation is by value: every `with*` method consumes the builder and
/// returns the extended one, so a half-mutated builder can never be observed.
/// `build` deploys every registration, drives the mesh to full pairwise
/// reachability, then binds the caller-provided slots.
pub struct TopologyBuilder {
    settings: MeshSettings,
    scope: Vec<Cluster>,
    registrations: Vec<Registration>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::with_settings(MeshSettings::default())
    }

    pub fn with_settings(settings: MeshSettings) -> Self {
        Self {
            settings,
            scope: Vec::new(),
            registrations: Vec::new(),
        }
    }

    /// Scopes subsequent registrations to `clusters`.
    ///
    /// Earlier registrations keep the scope they were added under.
    pub fn with_clusters(mut self, clusters: Vec<Cluster>) -> Self {
        self.scope = clusters;
        self
    }

    /// Registers `config` and remembers `slot` for post-build binding.
    pub fn with(mut self, slot: &InstanceRef, config: ServiceConfig) -> Self {
        self.registrations.push(Registration {
            config,
            slot: Some(slot.clone()),
            clusters: self.scope.clone(),
        });
        self
    }

    /// Registers `config` without a slot.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.registrations.push(Registration {
            config,
            slot: None,
            clusters: self.scope.clone(),
        });
        self
    }

    /// Deploys the topology and waits for mesh convergence.
    ///
    /// On success every ordered instance pair has completed at least one
    /// real echo call, so tests may assume reachability from the first
    /// asserted call onward.
    pub async fn build(self) -> Result<Instances, BuildError> {
        let mut targets = Vec::with_capacity(self.registrations.len());
        for registration in &self.registrations {
            registration
                .config
                .validate()
                .map_err(DeploymentError::InvalidConfig)?;
            let clusters: Vec<&Cluster> = match &registration.config.cluster {
                Some(pinned) => registration
                    .clusters
                    .iter()
                    .filter(|cluster| cluster.name() == pinned)
                    .collect(),
                None => registration.clusters.iter().collect(),
            };
            if clusters.is_empty() {
                return Err(DeploymentError::NoClusters {
                    service: registration.config.fqdn(),
                }
                .into());
            }
            targets.push(clusters);
        }

        let instances = self.deploy_all(&targets).await?;
        converge(&instances, &self.settings).await?;

        for (registration, group) in self.registrations.iter().zip(&instances) {
            if let (Some(slot), Some(first)) = (&registration.slot, group.first()) {
                slot.bind(first.clone());
            }
        }

        info!(
            event = events::BUILD_CONVERGED,
            services = self.registrations.len(),
            "topology is built and fully reachable"
        );
        Ok(Instances::new(instances.into_iter().flatten().collect()))
    }

    /// [`build`][Self::build], aborting the test through `failer` on error.
    pub async fn build_or_fail(self, failer: &dyn Failer) -> Instances {
        or_fail(failer, self.build().await, "building topology")
    }

    /// Deploys every (registration, cluster) product member in parallel.
    /// Output groups preserve registration order.
    async fn deploy_all(
        &self,
        targets: &[Vec<&Cluster>],
    ) -> Result<Vec<Vec<EchoInstance>>, DeploymentError> {
        let deploys = self
            .registrations
            .iter()
            .zip(targets)
            .map(|(registration, clusters)| async move {
                let per_cluster = clusters
                    .iter()
                    .copied()
                    .map(|cluster| deploy_one(&registration.config, cluster));
                futures::future::try_join_all(per_cluster).await
            });
        futures::future::try_join_all(deploys).await
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn deploy_one(
    config: &ServiceConfig,
    cluster: &Cluster,
) -> Result<EchoInstance, DeploymentError> {
    let service = config.fqdn();
    debug!(
        event = events::DEPLOY_START,
        service = %service,
        cluster = cluster.name(),
    );
    let deployment = match cluster.driver().deploy(config).await {
        Ok(deployment) => deployment,
        Err(err) => {
            warn!(
                event = events::DEPLOY_FAILED,
                service = %service,
                cluster = cluster.name(),
                err = %err,
            );
            return Err(err);
        }
    };
    if deployment.workloads.is_empty() {
        return Err(DeploymentError::NoWorkloads {
            service,
            cluster: cluster.name().to_string(),
        });
    }
    debug!(
        event = events::DEPLOY_OK,
        service = %service,
        cluster = cluster.name(),
        workloads = deployment.workloads.len(),
    );
    Ok(EchoInstance::new(config.clone(), cluster.clone(), deployment))
}

/// Probes every ordered instance pair until each has completed one real
/// echo call, or the convergence deadline passes.
///
/// Pairwise probing is O(n^2) in instance count; pair probes run
/// concurrently under `probe_concurrency`, so one slow pair never holds
/// back independently-ready pairs.
async fn converge(
    groups: &[Vec<EchoInstance>],
    settings: &MeshSettings,
) -> Result<(), ConvergenceTimeoutError> {
    let all: Vec<&EchoInstance> = groups.iter().flatten().collect();
    let started = Instant::now();
    let deadline = started + settings.convergence_timeout();

    let mut pairs = Vec::new();
    for (i, from) in all.iter().enumerate() {
        for (j, to) in all.iter().enumerate() {
            if i != j {
                pairs.push((*from, *to));
            }
        }
    }

    let interval = settings.probe_interval();
    let mut unready: Vec<(String, String)> = stream::iter(pairs)
        .map(|(from, to)| probe_pair(from, to, interval, deadline))
        .buffer_unordered(settings.probe_concurrency.max(1))
        .filter_map(|outcome| async move { outcome.err() })
        .collect()
        .await;

    if unready.is_empty() {
        return Ok(());
    }
    unready.sort();
    warn!(
        event = events::BUILD_FAILED,
        waited_ms = started.elapsed().as_millis() as u64,
        unready_pairs = unready.len(),
    );
    Err(ConvergenceTimeoutError {
        waited: started.elapsed(),
        unready_pairs: unready,
    })
}

async fn probe_pair(
    from: &EchoInstance,
    to: &EchoInstance,
    interval: Duration,
    deadline: Instant,
) -> Result<(), (String, String)> {
    let pair = (from.config().fqdn(), to.config().fqdn());
    let options = CallOptions::to_instance(to);
    let mut attempted = false;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() && attempted {
            debug!(
                event = events::PROBE_PAIR_TIMEOUT,
                pair = fields::format_pair(&pair.0, &pair.1),
            );
            return Err(pair);
        }
        // A pair first polled after the deadline still gets one probe,
        // bounded by the interval, so the timeout report only lists pairs
        // that failed an actual call.
        let budget = if remaining.is_zero() { interval } else { remaining };
        attempted = true;
        match tokio::time::timeout(budget, from.call(&options)).await {
            Ok(Ok(_)) => {
                trace!(
                    event = events::PROBE_PAIR_OK,
                    pair = fields::format_pair(&pair.0, &pair.1),
                );
                return Ok(());
            }
            Ok(Err(err)) => {
                trace!(
                    event = events::PROBE_PAIR_RETRY,
                    pair = fields::format_pair(&pair.0, &pair.1),
                    err = %err,
                );
            }
            Err(_) => {
                // Out of budget mid-call.
                return Err(pair);
            }
        }
        sleep(interval.min(deadline.saturating_duration_since(Instant::now()))).await;
    }
}
