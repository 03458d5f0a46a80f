//! Canonical structured field keys and value-format helpers.

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";

pub const SERVICE: &str = "service";
pub const CLUSTER: &str = "cluster";
pub const TARGET: &str = "target";
pub const SOURCE: &str = "source";
pub const POD: &str = "pod";
pub const NODE_ID: &str = "node_id";

pub const ATTEMPT: &str = "attempt";
pub const ATTEMPTS: &str = "attempts";
pub const WAITED_MS: &str = "waited_ms";
pub const ERR: &str = "err";

/// Renders an ordered instance pair for probe events.
pub fn format_pair(from: &str, to: &str) -> String {
    format!("{from}->{to}")
}
