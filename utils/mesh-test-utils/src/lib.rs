//! In-memory fakes for exercising `echo-mesh` without a real cluster.
//!
//! [`EchoNetwork`] is a shared reachability fabric; [`FakeClusterDriver`]
//! materializes services onto it and [`FakeProxyAdmin`] serves canned admin
//! snapshots. Tests tune readiness delays, blocked pairs, and injected
//! failures to reproduce the slow-convergence and flaky-call shapes the
//! harness exists to absorb.

mod network;
pub use network::{EchoNetwork, FakeEchoApp};

mod driver;
pub use driver::FakeClusterDriver;

mod admin;
pub use admin::FakeProxyAdmin;

mod logging;
pub use logging::init_logging;
