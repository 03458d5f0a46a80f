//! Declarative service descriptions and harness-wide tunables.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Wire protocol spoken on a service port.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Protocol {
    #[default]
    Http,
    Https,
    Grpc,
    Tcp,
    Udp,
}

impl Protocol {
    /// URL scheme used when building a forward request for this protocol.
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Grpc => "grpc",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

/// Address family a workload binds its listener to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum BindMode {
    /// Listen on all interfaces.
    #[default]
    Wildcard,
    /// Listen on the workload's own IP only.
    InstanceIp,
    /// Listen on the loopback address only.
    Localhost,
}

/// Service-facing port declaration.
///
/// `service_port` is where the service is reached; `workload_port` is where
/// each replica actually listens. The two need not match.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServicePort {
    pub name: String,
    pub protocol: Protocol,
    pub service_port: u16,
    pub workload_port: u16,
    /// Plain text when false.
    pub tls: bool,
    /// Server sends the first byte; the client must not.
    pub server_first: bool,
    pub bind: BindMode,
}

impl ServicePort {
    pub fn new(name: &str, protocol: Protocol, service_port: u16, workload_port: u16) -> Self {
        Self {
            name: name.to_string(),
            protocol,
            service_port,
            workload_port,
            tls: false,
            server_first: false,
            bind: BindMode::default(),
        }
    }
}

/// The subset of port fields relevant to one running replica.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkloadPort {
    pub port: u16,
    pub protocol: Protocol,
    pub tls: bool,
    pub server_first: bool,
}

impl From<&ServicePort> for WorkloadPort {
    fn from(port: &ServicePort) -> Self {
        Self {
            port: port.workload_port,
            protocol: port.protocol,
            tls: port.tls,
            server_first: port.server_first,
        }
    }
}

/// Declarative description of one logical echo service.
///
/// Immutable once registered with a
/// [`TopologyBuilder`][crate::builder::TopologyBuilder].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServiceConfig {
    pub service: String,
    pub namespace: String,
    pub ports: Vec<ServicePort>,
    /// Headless services have no service-level address.
    pub headless: bool,
    /// Pins the service to one named cluster within the builder's scope.
    pub cluster: Option<String>,
}

impl ServiceConfig {
    pub fn new(service: &str, namespace: &str, ports: Vec<ServicePort>) -> Self {
        Self {
            service: service.to_string(),
            namespace: namespace.to_string(),
            ports,
            headless: false,
            cluster: None,
        }
    }

    pub fn in_cluster(mut self, cluster: &str) -> Self {
        self.cluster = Some(cluster.to_string());
        self
    }

    /// Fully-qualified service name, used in logs and error reports.
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.service, self.namespace)
    }

    /// Checks the port-set invariants: at least one port, names unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::MissingServiceName);
        }
        if self.ports.is_empty() {
            return Err(ConfigError::NoPorts {
                service: self.fqdn(),
            });
        }
        for (i, port) in self.ports.iter().enumerate() {
            if self.ports[..i].iter().any(|other| other.name == port.name) {
                return Err(ConfigError::DuplicatePortName {
                    service: self.fqdn(),
                    port: port.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Looks up a declared port by name.
    pub fn port(&self, name: &str) -> Option<&ServicePort> {
        self.ports.iter().find(|port| port.name == name)
    }

    /// The first declared port, used as the convergence-probe target.
    pub fn first_port(&self) -> Option<&ServicePort> {
        self.ports.first()
    }
}

/// Service description failures caught before deployment.
#[derive(Debug)]
pub enum ConfigError {
    MissingServiceName,
    NoPorts { service: String },
    DuplicatePortName { service: String, port: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingServiceName => write!(f, "service name must not be empty"),
            ConfigError::NoPorts { service } => {
                write!(f, "service {service} declares no ports")
            }
            ConfigError::DuplicatePortName { service, port } => {
                write!(f, "service {service} declares port name '{port}' more than once")
            }
        }
    }
}

impl Error for ConfigError {}

/// Harness-wide tunables with conservative defaults.
///
/// Loadable from a JSON5 file so suites can share one settings profile.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct MeshSettings {
    /// Total budget for mesh convergence after deployment.
    pub convergence_timeout_ms: u64,
    /// Delay between reachability probes for one instance pair.
    pub probe_interval_ms: u64,
    /// Upper bound on concurrently in-flight pair probes.
    pub probe_concurrency: usize,
    /// Default per-call retry attempts.
    pub retry_max_attempts: u32,
    /// Default delay between retry attempts.
    pub retry_backoff_ms: u64,
    /// Default budget for one sidecar config-convergence wait.
    pub poll_timeout_ms: u64,
    /// Default delay between sidecar config polls.
    pub poll_interval_ms: u64,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            convergence_timeout_ms: 60_000,
            probe_interval_ms: 250,
            probe_concurrency: 8,
            retry_max_attempts: 5,
            retry_backoff_ms: 1_000,
            poll_timeout_ms: 30_000,
            poll_interval_ms: 500,
        }
    }
}

impl MeshSettings {
    pub fn convergence_timeout(&self) -> Duration {
        Duration::from_millis(self.convergence_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Reads settings from a JSON5 file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        json5::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Settings file failures.
#[derive(Debug)]
pub enum SettingsError {
    Read {
        path: String,
        source: std::io::Error,
    },
    Parse {
        path: String,
        source: json5::Error,
    },
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Read { path, .. } => {
                write!(f, "unable to read settings file {path}")
            }
            SettingsError::Parse { path, .. } => {
                write!(f, "unable to parse settings file {path}")
            }
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SettingsError::Read { source, .. } => Some(source),
            SettingsError::Parse { source, .. } => Some(source),
        }
    }
}
