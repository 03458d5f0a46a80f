use echo_mesh::{Cluster, MeshSettings, Protocol, ServiceConfig, ServicePort};
use mesh_test_utils::{EchoNetwork, FakeClusterDriver};
use std::sync::Arc;

pub(crate) fn fast_settings() -> MeshSettings {
    MeshSettings {
        convergence_timeout_ms: 2_000,
        probe_interval_ms: 10,
        retry_backoff_ms: 10,
        poll_timeout_ms: 500,
        poll_interval_ms: 10,
        ..MeshSettings::default()
    }
}

pub(crate) fn http_config(service: &str) -> ServiceConfig {
    ServiceConfig::new(
        service,
        "mesh-test",
        vec![
            ServicePort::new("http", Protocol::Http, 80, 18080),
            ServicePort::new("grpc", Protocol::Grpc, 7070, 17070),
        ],
    )
}

#[allow(dead_code)]
pub(crate) fn cluster(name: &str, network: &Arc<EchoNetwork>) -> Cluster {
    Cluster::new(Arc::new(FakeClusterDriver::new(name, Arc::clone(network))))
}

/// Service address a [`FakeClusterDriver`] assigns in `cluster`.
#[allow(dead_code)]
pub(crate) fn service_address(service: &str, cluster: &str) -> String {
    format!("{service}.mesh-test.{cluster}.svc")
}
