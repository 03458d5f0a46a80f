//! Replica-level handles: the echo endpoint boundary and `Workload`.

use crate::config::{Protocol, WorkloadPort};
use crate::error::CallError;
use crate::sidecar::Sidecar;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One forward-call request sent to a workload's echo endpoint.
#[derive(Clone, Debug)]
pub struct ForwardRequest {
    /// `host:port` of the endpoint the workload should call.
    pub target: String,
    pub scheme: Protocol,
    /// Connections to open; one parsed response is returned per connection.
    pub count: u32,
    pub headers: Vec<(String, String)>,
    pub payload: String,
    pub timeout: Duration,
}

/// Parsed result of one echo connection.
#[derive(Clone, Debug)]
pub struct EchoResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body echoed back by the target.
    pub body: String,
    pub latency: Duration,
}

impl EchoResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Echo endpoint of one running replica.
///
/// The wire protocol behind this boundary (request/response framing) is
/// collaborator-owned; the harness only sees parsed per-connection results.
#[async_trait]
pub trait EchoApp: Send + Sync {
    /// Executes one forward call originating from this replica.
    async fn forward_echo(&self, request: &ForwardRequest) -> Result<Vec<EchoResponse>, CallError>;

    /// App container logs.
    async fn logs(&self) -> Result<String, CallError>;
}

/// Handle to one live replica of an instance.
///
/// Pod name and address are immutable for the life of the replica. A
/// workload is destroyed by [`EchoInstance::restart`][crate::instance::EchoInstance::restart]
/// and replaced by a newly observed set; handles held across that boundary
/// refer to replicas that no longer exist.
#[derive(Clone)]
pub struct Workload {
    inner: Arc<WorkloadInner>,
}

struct WorkloadInner {
    pod_name: String,
    address: String,
    ports: Vec<WorkloadPort>,
    app: Arc<dyn EchoApp>,
    /// Present iff the deployment attached a proxy to this replica.
    sidecar: Option<Sidecar>,
}

impl Workload {
    pub fn new(
        pod_name: &str,
        address: &str,
        ports: Vec<WorkloadPort>,
        app: Arc<dyn EchoApp>,
        sidecar: Option<Sidecar>,
    ) -> Self {
        Self {
            inner: Arc::new(WorkloadInner {
                pod_name: pod_name.to_string(),
                address: address.to_string(),
                ports,
                app,
                sidecar,
            }),
        }
    }

    pub fn pod_name(&self) -> &str {
        &self.inner.pod_name
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn ports(&self) -> &[WorkloadPort] {
        &self.inner.ports
    }

    pub fn sidecar(&self) -> Option<&Sidecar> {
        self.inner.sidecar.as_ref()
    }

    /// Executes one forward call from this replica.
    pub async fn forward_echo(
        &self,
        request: &ForwardRequest,
    ) -> Result<Vec<EchoResponse>, CallError> {
        self.inner.app.forward_echo(request).await
    }

    /// App container logs.
    pub async fn logs(&self) -> Result<String, CallError> {
        self.inner.app.logs().await
    }
}

impl std::fmt::Debug for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workload")
            .field("pod_name", &self.inner.pod_name)
            .field("address", &self.inner.address)
            .finish_non_exhaustive()
    }
}
