use async_trait::async_trait;
use echo_mesh::{CallError, EchoApp, EchoResponse, ForwardRequest};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

/// Shared in-memory reachability fabric.
///
/// Hosts become routable once registered (optionally after a delay), pairs
/// can be blocked in one direction, and individual hosts can be told to
/// fail their next N deliveries. All state is behind one mutex; nothing
/// here awaits while holding it.
pub struct EchoNetwork {
    state: Mutex<NetworkState>,
}

#[derive(Default)]
struct NetworkState {
    ready_at: HashMap<String, Instant>,
    blocked: HashSet<(String, String)>,
    fail_next: HashMap<String, u32>,
    delivered: u64,
}

impl EchoNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(NetworkState::default()),
        })
    }

    /// Makes `host` routable immediately.
    pub fn register_host(&self, host: &str) {
        self.register_host_after(host, Duration::ZERO);
    }

    /// Makes `host` routable once `delay` has elapsed. Probes before then
    /// see it as unreachable, which is exactly what convergence absorbs.
    pub fn register_host_after(&self, host: &str, delay: Duration) {
        let mut state = self.lock();
        state.ready_at.insert(host.to_string(), Instant::now() + delay);
    }

    /// Drops all routes to `host` until it is registered again.
    pub fn unregister_host(&self, host: &str) {
        self.lock().ready_at.remove(host);
    }

    /// Blocks deliveries from `from_service` to `to_host`, one direction.
    pub fn block(&self, from_service: &str, to_host: &str) {
        self.lock()
            .blocked
            .insert((from_service.to_string(), to_host.to_string()));
    }

    pub fn unblock(&self, from_service: &str, to_host: &str) {
        self.lock()
            .blocked
            .remove(&(from_service.to_string(), to_host.to_string()));
    }

    /// The next `count` deliveries to `to_host` fail, then routing recovers.
    pub fn fail_next(&self, to_host: &str, count: u32) {
        self.lock().fail_next.insert(to_host.to_string(), count);
    }

    /// Total deliveries that reached a routable host.
    pub fn delivered(&self) -> u64 {
        self.lock().delivered
    }

    fn route(&self, from_service: &str, to_host: &str) -> Result<(), String> {
        let mut state = self.lock();
        if state
            .blocked
            .contains(&(from_service.to_string(), to_host.to_string()))
        {
            return Err(format!("route {from_service} -> {to_host} is blocked"));
        }
        match state.ready_at.get(to_host) {
            None => return Err(format!("no route to host {to_host}")),
            Some(ready_at) if *ready_at > Instant::now() => {
                return Err(format!("host {to_host} is not ready yet"));
            }
            Some(_) => {}
        }
        if let Some(remaining) = state.fail_next.get_mut(to_host) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(format!("injected failure for host {to_host}"));
            }
        }
        state.delivered += 1;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Echo application serving one fake workload.
///
/// Forwards consult the shared [`EchoNetwork`]; every handled request is
/// appended to an in-memory log retrievable through `logs`.
pub struct FakeEchoApp {
    service: String,
    pod_name: String,
    network: Arc<EchoNetwork>,
    log: Mutex<Vec<String>>,
}

impl FakeEchoApp {
    pub fn new(service: &str, pod_name: &str, network: Arc<EchoNetwork>) -> Self {
        Self {
            service: service.to_string(),
            pod_name: pod_name.to_string(),
            network,
            log: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, line: String) {
        if let Ok(mut log) = self.log.lock() {
            log.push(line);
        }
    }
}

#[async_trait]
impl EchoApp for FakeEchoApp {
    async fn forward_echo(
        &self,
        request: &ForwardRequest,
    ) -> Result<Vec<EchoResponse>, CallError> {
        let host = request
            .target
            .rsplit_once(':')
            .map(|(host, _port)| host)
            .unwrap_or(request.target.as_str());

        let mut responses = Vec::with_capacity(request.count as usize);
        for connection in 0..request.count.max(1) {
            if let Err(reason) = self.network.route(&self.service, host) {
                trace!(pod = %self.pod_name, target = %request.target, %reason, "forward dropped");
                self.record(format!("forward to {} failed: {reason}", request.target));
                return Err(CallError::Unreachable {
                    target: request.target.clone(),
                    reason,
                });
            }
            self.record(format!(
                "forward {connection} to {} ({} bytes)",
                request.target,
                request.payload.len()
            ));
            responses.push(EchoResponse {
                status: 200,
                headers: request.headers.clone(),
                body: request.payload.clone(),
                latency: Duration::ZERO,
            });
        }
        Ok(responses)
    }

    async fn logs(&self) -> Result<String, CallError> {
        let log = match self.log.lock() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(log.join("\n"))
    }
}
