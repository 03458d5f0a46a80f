mod support;

use echo_mesh::{
    CallOptions, Caller, Cluster, DeploymentError, InstanceRef, TopologyBuilder,
};
use mesh_test_utils::{init_logging, EchoNetwork, FakeClusterDriver};
use std::sync::Arc;

#[tokio::test]
async fn restart_replaces_the_full_workload_set() {
    init_logging();
    let network = EchoNetwork::new();
    let driver = Arc::new(FakeClusterDriver::new("primary", network).with_replicas(2));

    let a = InstanceRef::new();
    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![Cluster::new(driver.clone())])
        .with(&a, support::http_config("a"))
        .build()
        .await
        .unwrap();
    let instance = a.get().unwrap();

    let before = instance.workloads().await.unwrap();
    let before_pods: Vec<String> = before.iter().map(|w| w.pod_name().to_string()).collect();
    assert_eq!(before_pods, vec!["a-v1-0", "a-v1-1"]);

    instance.restart().await.unwrap();
    assert_eq!(driver.generations(), 2);

    let after = instance.workloads().await.unwrap();
    let after_pods: Vec<String> = after.iter().map(|w| w.pod_name().to_string()).collect();
    assert_eq!(after_pods, vec!["a-v2-0", "a-v2-1"]);

    // Handles taken before the restart still name the old generation.
    assert_eq!(before[0].pod_name(), "a-v1-0");
}

#[tokio::test]
async fn restart_failure_keeps_the_previous_workloads() {
    init_logging();
    let network = EchoNetwork::new();
    let driver = Arc::new(FakeClusterDriver::new("primary", network));

    let a = InstanceRef::new();
    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![Cluster::new(driver.clone())])
        .with(&a, support::http_config("a"))
        .build()
        .await
        .unwrap();
    let instance = a.get().unwrap();

    driver.fail_next_deploys(1);
    let err = instance.restart().await.unwrap_err();
    assert!(matches!(err, DeploymentError::MaterializeFailed { .. }));

    let workloads = instance.workloads().await.unwrap();
    assert_eq!(workloads[0].pod_name(), "a-v1-0");
}

#[tokio::test]
async fn workload_logs_record_forwarded_traffic() {
    init_logging();
    let network = EchoNetwork::new();

    let client = InstanceRef::new();
    let server = InstanceRef::new();
    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![support::cluster("primary", &network)])
        .with(&client, support::http_config("client"))
        .with(&server, support::http_config("server"))
        .build()
        .await
        .unwrap();
    let client = client.get().unwrap();
    let server = server.get().unwrap();

    client
        .call(&CallOptions::to_instance(&server).with_payload("traced"))
        .await
        .unwrap();

    let workloads = client.workloads().await.unwrap();
    let logs = workloads[0].logs().await.unwrap();
    assert!(logs.contains("forward"), "got logs: {logs}");
}

#[tokio::test]
async fn headless_services_are_dialed_by_replica_address() {
    init_logging();
    let network = EchoNetwork::new();

    let mut headless = support::http_config("stateful");
    headless.headless = true;

    let client = InstanceRef::new();
    let server = InstanceRef::new();
    TopologyBuilder::with_settings(support::fast_settings())
        .with_clusters(vec![support::cluster("primary", &network)])
        .with(&client, support::http_config("client"))
        .with(&server, headless)
        .build()
        .await
        .unwrap();
    let client = client.get().unwrap();
    let server = server.get().unwrap();

    assert_eq!(server.address(), "");
    let responses = client
        .call(&CallOptions::to_instance(&server))
        .await
        .unwrap();
    assert_eq!(responses.len(), 1);
}
