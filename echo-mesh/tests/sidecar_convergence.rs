mod support;

use echo_mesh::{
    Cluster, ConfigDump, InstanceRef, PollPolicy, Sidecar, TopologyBuilder, WaitError,
};
use mesh_test_utils::{init_logging, EchoNetwork, FakeClusterDriver, FakeProxyAdmin};
use std::sync::Arc;
use std::time::Duration;

fn generation(dump: &ConfigDump) -> u64 {
    dump.configs
        .first()
        .and_then(|config| config.get("generation"))
        .and_then(|generation| generation.as_u64())
        .unwrap_or(0)
}

fn fast_poll() -> PollPolicy {
    PollPolicy::default()
        .with_interval(Duration::from_millis(10))
        .with_timeout(Duration::from_millis(500))
}

#[tokio::test]
async fn wait_for_config_accepts_once_the_push_lands() {
    init_logging();
    let admin = Arc::new(FakeProxyAdmin::new());
    let sidecar = Sidecar::new("sidecar~pod-0", admin.clone());

    let pusher = admin.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pusher.bump_generation();
    });

    let dump = sidecar
        .wait_for_config(
            |dump| Ok::<bool, String>(generation(dump) >= 2),
            &fast_poll(),
        )
        .await
        .expect("poll should observe the bumped generation");
    assert!(generation(&dump) >= 2);
    assert!(admin.fetches() >= 2);
}

#[tokio::test]
async fn fetch_failures_are_contained_inside_the_poll() {
    init_logging();
    let admin = Arc::new(FakeProxyAdmin::new());
    admin.fail_next_fetches(3);
    let sidecar = Sidecar::new("sidecar~pod-0", admin.clone());

    let dump = sidecar
        .wait_for_config(|dump| Ok::<bool, String>(generation(dump) >= 1), &fast_poll())
        .await
        .expect("poll should ride out transient fetch failures");
    assert!(generation(&dump) >= 1);
    assert!(admin.fetches() >= 4);
}

#[tokio::test]
async fn predicate_rejection_aborts_without_further_polling() {
    init_logging();
    let admin = Arc::new(FakeProxyAdmin::new());
    let sidecar = Sidecar::new("sidecar~pod-0", admin.clone());

    let err = sidecar
        .wait_for_config(
            |_dump| Err("unexpected listener drained".to_string()),
            &fast_poll(),
        )
        .await
        .unwrap_err();

    match err {
        WaitError::Rejected(reason) => assert_eq!(reason, "unexpected listener drained"),
        WaitError::Timeout(_) => panic!("rejection must not be reported as a timeout"),
    }
    assert_eq!(admin.fetches(), 1);
}

#[tokio::test]
async fn timeout_carries_the_last_fetch_error() {
    init_logging();
    let admin = Arc::new(FakeProxyAdmin::new());
    admin.fail_next_fetches(u32::MAX);
    let sidecar = Sidecar::new("sidecar~pod-0", admin.clone());

    let policy = PollPolicy::default()
        .with_interval(Duration::from_millis(10))
        .with_timeout(Duration::from_millis(100));
    let err = sidecar
        .wait_for_config(|dump| Ok::<bool, String>(generation(dump) >= 1), &policy)
        .await
        .unwrap_err();

    match err {
        WaitError::Timeout(timeout) => {
            assert!(timeout.attempts >= 1);
            assert!(timeout.waited >= Duration::from_millis(100));
            let fetch_error = timeout
                .last_fetch_error
                .expect("every attempt failed at the fetch step");
            assert_eq!(fetch_error.endpoint, "config_dump");
        }
        WaitError::Rejected(reason) => panic!("unexpected rejection: {reason}"),
    }
}

#[tokio::test]
async fn deployed_workloads_expose_their_sidecars() {
    init_logging();
    let network = EchoNetwork::new();
    let cluster = Cluster::new(Arc::new(
        FakeClusterDriver::new("primary", network).with_sidecars(),
    ));

    let a = InstanceRef::new();
    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![cluster])
        .with(&a, support::http_config("a"))
        .build()
        .await
        .unwrap();

    let workloads = a.get().unwrap().workloads().await.unwrap();
    let sidecar = workloads[0].sidecar().expect("driver attaches sidecars");
    assert!(sidecar.node_id().starts_with("sidecar~"));

    let info = sidecar.info().await.unwrap();
    assert_eq!(info.state, echo_mesh::ServerState::Live);

    let dump = sidecar
        .wait_for_config(|dump| Ok::<bool, String>(generation(dump) >= 1), &fast_poll())
        .await
        .unwrap();
    assert_eq!(generation(&dump), 1);
}
