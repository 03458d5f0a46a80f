mod support;

use echo_mesh::{BuildError, Cluster, InstanceRef, PanicFailer, TopologyBuilder};
use mesh_test_utils::{init_logging, EchoNetwork, FakeClusterDriver};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn build_converges_and_binds_slots() {
    init_logging();
    let network = EchoNetwork::new();
    let cluster = Cluster::new(Arc::new(
        FakeClusterDriver::new("primary", Arc::clone(&network))
            .with_readiness_delay(Duration::from_millis(50)),
    ));

    let a = InstanceRef::new();
    let b = InstanceRef::new();
    let instances = TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![cluster])
        .with(&a, support::http_config("a"))
        .with(&b, support::http_config("b"))
        .with_config(support::http_config("c"))
        .build()
        .await
        .expect("topology should converge once hosts become ready");

    assert_eq!(instances.len(), 3);
    assert_eq!(a.get().unwrap().config().service, "a");
    assert_eq!(b.get().unwrap().config().service, "b");
    assert!(instances.service("c").is_some());
    assert!(instances.service("unknown").is_none());

    // Six ordered pairs, each proved reachable by at least one real call.
    assert!(network.delivered() >= 6);
}

#[tokio::test]
async fn blocked_pair_times_out_and_is_reported() {
    init_logging();
    let network = EchoNetwork::new();
    network.block("a.mesh-test", &support::service_address("b", "primary"));

    let mut settings = support::fast_settings();
    settings.convergence_timeout_ms = 150;

    let err = TopologyBuilder::with_settings(settings)
        .with_clusters(vec![support::cluster("primary", &network)])
        .with_config(support::http_config("a"))
        .with_config(support::http_config("b"))
        .build()
        .await
        .unwrap_err();

    match err {
        BuildError::Convergence(timeout) => {
            assert_eq!(
                timeout.unready_pairs,
                vec![("a.mesh-test".to_string(), "b.mesh-test".to_string())]
            );
        }
        other => panic!("expected convergence timeout, got {other}"),
    }
}

#[tokio::test]
async fn every_config_is_deployed_to_every_scoped_cluster() {
    init_logging();
    let network = EchoNetwork::new();
    let east = support::cluster("east", &network);
    let west = support::cluster("west", &network);

    let a = InstanceRef::new();
    let instances = TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![east, west])
        .with(&a, support::http_config("a"))
        .with_config(support::http_config("b"))
        .build()
        .await
        .unwrap();

    assert_eq!(instances.len(), 4);
    // The slot binds the registration's first-cluster instance.
    assert_eq!(a.get().unwrap().cluster_name(), "east");

    let clusters: Vec<&str> = instances.iter().map(|i| i.cluster_name()).collect();
    assert_eq!(clusters.iter().filter(|c| **c == "east").count(), 2);
    assert_eq!(clusters.iter().filter(|c| **c == "west").count(), 2);
}

#[tokio::test]
async fn cluster_scope_applies_to_subsequent_registrations_only() {
    init_logging();
    let network = EchoNetwork::new();

    let a = InstanceRef::new();
    let b = InstanceRef::new();
    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![support::cluster("east", &network)])
        .with(&a, support::http_config("a"))
        .with_clusters(vec![support::cluster("west", &network)])
        .with(&b, support::http_config("b"))
        .build()
        .await
        .unwrap();

    assert_eq!(a.get().unwrap().cluster_name(), "east");
    assert_eq!(b.get().unwrap().cluster_name(), "west");
}

#[tokio::test]
async fn cluster_affinity_pins_a_config_to_one_cluster() {
    init_logging();
    let network = EchoNetwork::new();

    let pinned = InstanceRef::new();
    let instances = TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![
            support::cluster("east", &network),
            support::cluster("west", &network),
        ])
        .with_config(support::http_config("a"))
        .with(&pinned, support::http_config("b").in_cluster("west"))
        .build()
        .await
        .unwrap();

    // "a" lands in both clusters, "b" only where it is pinned.
    assert_eq!(instances.len(), 3);
    assert_eq!(pinned.get().unwrap().cluster_name(), "west");
}

#[tokio::test]
async fn affinity_outside_the_scope_fails_the_build() {
    init_logging();
    let network = EchoNetwork::new();

    let err = TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![support::cluster("east", &network)])
        .with_config(support::http_config("a").in_cluster("west"))
        .build()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Deployment(echo_mesh::DeploymentError::NoClusters { .. })
    ));
}

#[tokio::test]
#[should_panic(expected = "building topology")]
async fn build_or_fail_routes_errors_through_the_failer() {
    init_logging();
    let network = EchoNetwork::new();
    let driver = Arc::new(FakeClusterDriver::new("primary", network));
    driver.fail_next_deploys(1);

    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![Cluster::new(driver)])
        .with_config(support::http_config("a"))
        .build_or_fail(&PanicFailer)
        .await;
}

#[tokio::test]
async fn failed_build_leaves_slots_unbound() {
    init_logging();
    let network = EchoNetwork::new();
    let driver = Arc::new(FakeClusterDriver::new("primary", network));
    driver.fail_next_deploys(1);

    let a = InstanceRef::new();
    let result = TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![Cluster::new(driver)])
        .with(&a, support::http_config("a"))
        .build()
        .await;

    assert!(result.is_err());
    assert!(a.get().is_none());
}
