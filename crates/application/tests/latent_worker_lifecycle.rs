//! Lifecycle tests for the latent worker controller against the in-memory
//! cluster client.

use std::sync::Arc;

use sutegi_application::workers::LatentWorkerController;
use sutegi_domain::shared_kernel::{BuildId, ControllerState};
use sutegi_domain::workers::{
    BuildContext, ClusterClient, ClusterError, DecommissionError, LatentWorker,
    PropertyBuildContext, SubstantiateError,
};
use sutegi_infrastructure::cluster::InMemoryClusterClient;
use sutegi_shared::config::LatentWorkerConfig;

const WORKLOAD: &str = "sutegi-worker-builder-01";

fn make_controller(cluster: Arc<InMemoryClusterClient>) -> LatentWorkerController {
    let config = LatentWorkerConfig::new("builder-01")
        .with_image("worker:latest")
        .with_namespace("ci")
        .with_stop_wait_timeout_secs(1);
    LatentWorkerController::from_config(&config, cluster).unwrap()
}

fn make_build() -> PropertyBuildContext {
    PropertyBuildContext::new(BuildId::new())
}

#[tokio::test]
async fn substantiate_then_decommission_leaves_no_workload() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    assert!(controller.substantiate(&make_build()).await.unwrap());
    assert_eq!(controller.state().await, ControllerState::Running);

    controller.stop_instance(false, true).await.unwrap();
    assert_eq!(controller.state().await, ControllerState::Stopped);
    assert!(!cluster.contains("ci", WORKLOAD));
    assert_eq!(cluster.workload_count(), 0);
}

#[tokio::test]
async fn decommission_without_workload_succeeds_when_not_reporting() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster);

    controller.stop_instance(false, false).await.unwrap();
    assert_eq!(controller.state().await, ControllerState::Stopped);
}

#[tokio::test]
async fn decommission_not_found_is_benign_and_skips_wait() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    // No workload exists; delete reports NotFound even with reportFailure set
    controller.stop_instance(false, true).await.unwrap();
    assert_eq!(cluster.delete_calls(), 1);
    assert_eq!(cluster.wait_calls(), 0);
    assert_eq!(controller.state().await, ControllerState::Stopped);
}

#[tokio::test]
async fn non_not_found_delete_error_surfaces_when_reporting() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    controller.substantiate(&make_build()).await.unwrap();
    cluster.fail_next_delete(ClusterError::Api {
        reason: "Forbidden".to_string(),
        message: "pods \"sutegi-worker-builder-01\" is forbidden".to_string(),
    });

    let err = controller.stop_instance(false, true).await.unwrap_err();
    assert!(matches!(err, DecommissionError::Cluster { ref reason } if reason.contains("Forbidden")));
    // Local state is clean even though the failure was reported
    assert_eq!(controller.state().await, ControllerState::Stopped);
}

#[tokio::test]
async fn suppressed_delete_error_still_waits_for_removal() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    controller.substantiate(&make_build()).await.unwrap();

    // The workload disappears behind the controller's back while its own
    // delete request fails with a non-NotFound error
    cluster.delete_workload("ci", WORKLOAD).await.unwrap();
    cluster.fail_next_delete(ClusterError::Connection("connection reset".to_string()));

    controller.stop_instance(false, false).await.unwrap();
    assert_eq!(cluster.wait_calls(), 1);
    assert_eq!(controller.state().await, ControllerState::Stopped);
}

#[tokio::test]
async fn repeated_substantiate_removes_stale_workload_first() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    assert!(controller.substantiate(&make_build()).await.unwrap());
    assert_eq!(cluster.workload_count(), 1);

    // Second substantiate without an intervening decommission: the stale
    // workload is removed before the new one is created
    assert!(controller.substantiate(&make_build()).await.unwrap());
    assert_eq!(cluster.workload_count(), 1);
    assert_eq!(controller.state().await, ControllerState::Running);
    assert_eq!(cluster.create_calls(), 2);
    assert!(cluster.delete_calls() >= 2);
}

#[tokio::test]
async fn substantiated_spec_matches_build_inputs() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    let build = make_build();
    controller.substantiate(&build).await.unwrap();

    let spec = cluster.workload("ci", WORKLOAD).unwrap();
    assert_eq!(spec.image, "worker:latest");
    assert_eq!(spec.restart_policy.to_string(), "Never");
    assert!(spec.sidecars.is_empty());
    assert!(spec
        .env
        .iter()
        .any(|e| e.name == "SUTEGI_WORKER_NAME" && e.value == "builder-01"));
    assert!(spec
        .env
        .iter()
        .any(|e| e.name == "SUTEGI_BUILD_ID" && e.value == build.build_id().to_string()));
}

#[tokio::test]
async fn forbidden_create_becomes_wrapped_failure() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    cluster.fail_next_create("Forbidden", "pods is forbidden in namespace ci");

    let err = controller.substantiate(&make_build()).await.unwrap_err();
    match err {
        SubstantiateError::FailedToSubstantiate { reason } => {
            assert!(reason.contains("Forbidden"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(controller.state().await, ControllerState::Stopped);
    assert_eq!(cluster.workload_count(), 0);
}

#[tokio::test]
async fn fast_decommission_skips_the_wait() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    controller.substantiate(&make_build()).await.unwrap();
    controller.stop_instance(true, true).await.unwrap();

    assert_eq!(cluster.wait_calls(), 0);
    assert_eq!(controller.state().await, ControllerState::Stopped);
}

#[tokio::test]
async fn deletion_wait_timeout_fails_but_allows_resubstantiation() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = make_controller(cluster.clone());

    controller.substantiate(&make_build()).await.unwrap();

    // The cluster accepts the delete but the workload lingers
    cluster.hold_deletions(true);
    let err = controller.stop_instance(false, true).await.unwrap_err();
    assert!(matches!(err, DecommissionError::Timeout { .. }));
    assert_eq!(controller.state().await, ControllerState::Stopped);

    // Once the cluster recovers, substantiate is permitted again
    cluster.hold_deletions(false);
    assert!(controller.substantiate(&make_build()).await.unwrap());
    assert_eq!(cluster.workload_count(), 1);
}

#[tokio::test]
async fn concurrent_substantiates_keep_at_most_one_workload() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));
    let controller = Arc::new(make_controller(cluster.clone()));

    let a = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.substantiate(&make_build()).await })
    };
    let b = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.substantiate(&make_build()).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(cluster.workload_count(), 1);
    assert_eq!(controller.state().await, ControllerState::Running);
}

#[tokio::test]
async fn independent_identities_do_not_interfere() {
    let cluster = Arc::new(InMemoryClusterClient::new("default"));

    let first = make_controller(cluster.clone());
    let second = LatentWorkerController::from_config(
        &LatentWorkerConfig::new("builder-02")
            .with_image("worker:latest")
            .with_namespace("ci")
            .with_stop_wait_timeout_secs(1),
        cluster.clone(),
    )
    .unwrap();

    first.substantiate(&make_build()).await.unwrap();
    second.substantiate(&make_build()).await.unwrap();
    assert_eq!(cluster.workload_count(), 2);

    first.stop_instance(false, true).await.unwrap();
    assert!(!cluster.contains("ci", WORKLOAD));
    assert!(cluster.contains("ci", "sutegi-worker-builder-02"));
    assert_eq!(second.state().await, ControllerState::Running);
}
