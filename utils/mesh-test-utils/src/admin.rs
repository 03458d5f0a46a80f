use async_trait::async_trait;
use echo_mesh::{
    ConfigDump, FetchError, Listeners, MetricFamily, MetricSample, MetricsSnapshot, ProxyAdmin,
    ProxyClusters, ServerInfo, ServerState,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

/// Canned proxy admin endpoint.
///
/// Config dumps carry a monotonic generation number; tests bump it to
/// simulate the control plane pushing new config, and accept predicates
/// watch for the bump. `fail_next_fetches` exercises fetch-failure
/// containment in the polling loop.
pub struct FakeProxyAdmin {
    started: Instant,
    generation: AtomicU64,
    fetches: AtomicU64,
    fail_next: AtomicU32,
}

impl FakeProxyAdmin {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            generation: AtomicU64::new(1),
            fetches: AtomicU64::new(0),
            fail_next: AtomicU32::new(0),
        }
    }

    /// Simulates a config push: later dumps report the next generation.
    pub fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Total admin fetches served, failed ones included.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// The next `count` fetches on any endpoint fail.
    pub fn fail_next_fetches(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    fn fetch(&self, endpoint: &'static str) -> Result<(), FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(FetchError {
                endpoint,
                reason: "injected admin failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FakeProxyAdmin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxyAdmin for FakeProxyAdmin {
    async fn server_info(&self) -> Result<ServerInfo, FetchError> {
        self.fetch("server_info")?;
        Ok(ServerInfo {
            version: "fake-proxy/0.1".to_string(),
            state: ServerState::Live,
            uptime_secs: self.started.elapsed().as_secs(),
        })
    }

    async fn config_dump(&self) -> Result<ConfigDump, FetchError> {
        self.fetch("config_dump")?;
        Ok(ConfigDump {
            configs: vec![json!({
                "@type": "fake.proxy/config",
                "generation": self.generation(),
            })],
        })
    }

    async fn clusters(&self) -> Result<ProxyClusters, FetchError> {
        self.fetch("clusters")?;
        Ok(ProxyClusters {
            cluster_statuses: vec![json!({
                "name": "outbound|80||echo",
                "healthy": true,
            })],
        })
    }

    async fn listeners(&self) -> Result<Listeners, FetchError> {
        self.fetch("listeners")?;
        Ok(Listeners {
            listener_statuses: vec![json!({
                "name": "virtualInbound",
                "local_address": "0.0.0.0:15006",
            })],
        })
    }

    async fn stats(&self) -> Result<MetricsSnapshot, FetchError> {
        self.fetch("stats")?;
        let mut snapshot = MetricsSnapshot::new();
        snapshot.insert(
            "admin_fetches_total".to_string(),
            MetricFamily {
                name: "admin_fetches_total".to_string(),
                help: "Admin fetches served by this fake".to_string(),
                samples: vec![MetricSample {
                    labels: HashMap::new(),
                    value: self.fetches() as f64,
                }],
            },
        );
        Ok(snapshot)
    }

    async fn logs(&self) -> Result<String, FetchError> {
        self.fetch("logs")?;
        Ok(format!(
            "proxy generation {} after {} fetches",
            self.generation(),
            self.fetches()
        ))
    }
}
