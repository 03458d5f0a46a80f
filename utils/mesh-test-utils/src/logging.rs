use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// One-time `tracing_subscriber` initialization for test binaries.
///
/// Library code never installs a global subscriber; call this from each
/// test that wants log output. Safe to call repeatedly.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
