//! # echo-mesh
//!
//! `echo-mesh` builds disposable echo-service topologies for mesh
//! integration tests and drives traffic through them.
//!
//! Typical usage is API-first and remains centered on [`TopologyBuilder`]
//! and the [`EchoInstance`] handles it binds. A test declares its services,
//! builds the topology, and asserts on real calls; by the time `build`
//! returns, every ordered instance pair has completed at least one echo
//! call, so the first asserted call never races mesh programming.
//!
//! ```
//! use std::sync::Arc;
//! use echo_mesh::{
//!     CallOptions, Caller, Cluster, InstanceRef, MeshSettings, Protocol,
//!     RetryPolicy, ServiceConfig, ServicePort, TopologyBuilder,
//! };
//!
//! # pub mod mock_cluster {
//! #     use std::sync::Arc;
//! #     use std::time::Duration;
//! #     use async_trait::async_trait;
//! #     use echo_mesh::{
//! #         CallError, ClusterDriver, Deployment, DeploymentError, EchoApp,
//! #         EchoResponse, ForwardRequest, ServiceConfig, Workload,
//! #     };
//! #
//! #     pub struct MockApp;
//! #
//! #     #[async_trait]
//! #     impl EchoApp for MockApp {
//! #         async fn forward_echo(
//! #             &self,
//! #             request: &ForwardRequest,
//! #         ) -> Result<Vec<EchoResponse>, CallError> {
//! #             Ok(vec![EchoResponse {
//! #                 status: 200,
//! #                 headers: Vec::new(),
//! #                 body: request.payload.clone(),
//! #                 latency: Duration::ZERO,
//! #             }])
//! #         }
//! #
//! #         async fn logs(&self) -> Result<String, CallError> {
//! #             Ok(String::new())
//! #         }
//! #     }
//! #
//! #     pub struct MockDriver;
//! #
//! #     #[async_trait]
//! #     impl ClusterDriver for MockDriver {
//! #         fn cluster_name(&self) -> &str {
//! #             "primary"
//! #         }
//! #
//! #         async fn deploy(
//! #             &self,
//! #             config: &ServiceConfig,
//! #         ) -> Result<Deployment, DeploymentError> {
//! #             Ok(Deployment {
//! #                 address: format!("{}.svc", config.fqdn()),
//! #                 workloads: vec![Workload::new(
//! #                     &format!("{}-0", config.service),
//! #                     "10.0.0.1",
//! #                     config.ports.iter().map(Into::into).collect(),
//! #                     Arc::new(MockApp),
//! #                     None,
//! #                 )],
//! #             })
//! #         }
//! #
//! #         async fn restart(
//! #             &self,
//! #             config: &ServiceConfig,
//! #         ) -> Result<Deployment, DeploymentError> {
//! #             self.deploy(config).await
//! #         }
//! #     }
//! # }
//!
//! # tokio::runtime::Builder::new_current_thread()
//! #     .enable_time()
//! #     .build()
//! #     .unwrap()
//! #     .block_on(async {
//! let cluster = Cluster::new(Arc::new(mock_cluster::MockDriver));
//! let client = InstanceRef::new();
//! let server = InstanceRef::new();
//!
//! TopologyBuilder::with_settings(MeshSettings::default())
//!     .with_clusters(vec![cluster])
//!     .with(&client, ServiceConfig::new(
//!         "client",
//!         "demo",
//!         vec![ServicePort::new("http", Protocol::Http, 80, 18080)],
//!     ))
//!     .with(&server, ServiceConfig::new(
//!         "server",
//!         "demo",
//!         vec![ServicePort::new("http", Protocol::Http, 80, 18080)],
//!     ))
//!     .build()
//!     .await
//!     .unwrap();
//!
//! let client = client.get().unwrap();
//! let server = server.get().unwrap();
//! let responses = client
//!     .call_with_retry(
//!         &CallOptions::to_instance(&server).with_payload("hello"),
//!         &RetryPolicy::default(),
//!     )
//!     .await
//!     .unwrap();
//! assert!(responses.iter().all(|r| r.is_ok()));
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Topology: `TopologyBuilder`, slot binding, mesh convergence
//! - Handles: `EchoInstance` / `Workload` / `Sidecar`, cheap-clone views of
//!   deployed state
//! - Traffic: `Caller` trait, `CallOptions`, bounded retry
//! - Polling: generic accept-predicate waits over admin snapshots
//! - Drivers: `ClusterDriver` / `EchoApp` / `ProxyAdmin` seams a backend
//!   implements once per environment
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a
//! global subscriber. Binaries/tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod admin;
pub use admin::{
    Clusters as ProxyClusters, ConfigDump, Listeners, MetricFamily, MetricSample,
    MetricsSnapshot, ProxyAdmin, ServerInfo, ServerState,
};

mod builder;
pub use builder::{InstanceRef, TopologyBuilder};

mod caller;
pub use caller::{CallOptions, CallResponses, CallTarget, Caller, Callers};

mod config;
pub use config::{
    BindMode, MeshSettings, Protocol, ServiceConfig, ServicePort, SettingsError, WorkloadPort,
};

mod driver;
pub use driver::{Cluster, ClusterDriver, Deployment};

mod error;
pub use error::{
    BuildError, CallError, ConvergenceTimeoutError, DeploymentError, FetchError,
    RetryExhaustedError, TimeoutError,
};
pub use config::ConfigError;

mod failer;
pub use failer::{or_fail, Failer, PanicFailer};

mod instance;
pub use instance::{EchoInstance, Instances};

#[doc(hidden)]
pub mod observability;

mod retry;
pub use retry::RetryPolicy;

mod sidecar;
pub use sidecar::Sidecar;

mod wait;
pub use wait::{poll_until, PollPolicy, WaitError};

mod workload;
pub use workload::{EchoApp, EchoResponse, ForwardRequest, Workload};
