//! Latent worker lifecycle controller
//!
//! One controller instance owns the lifecycle of one latent worker identity
//! across many builds: it substantiates the backing workload when the
//! scheduler asks for it and decommissions it afterwards. Start and stop for
//! the same identity are serialized by a mutex held across the whole
//! operation; distinct identities run on independent controller instances
//! and never share mutable state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sutegi_domain::shared_kernel::{ControllerState, SharedError, WorkerIdentity};
use sutegi_domain::workers::{
    BuildContext, ClusterClient, DecommissionError, LatentWorker, MasterAddress,
    SubstantiateError, WorkloadHandle, WorkloadSpec, WorkloadSpecBuilder,
};
use sutegi_shared::config::LatentWorkerConfig;

struct ControllerInner {
    state: ControllerState,
    /// Spec rendered for the current run; cleared unconditionally when a
    /// decommission begins so nothing stale leaks into the next build
    current_spec: Option<WorkloadSpec>,
    /// Acknowledgment of the workload backing the current run
    handle: Option<WorkloadHandle>,
}

/// Controller for one latent worker identity
pub struct LatentWorkerController {
    identity: WorkerIdentity,
    namespace: String,
    builder: WorkloadSpecBuilder,
    cluster: Arc<dyn ClusterClient>,
    stop_wait_timeout: Duration,
    inner: Mutex<ControllerInner>,
}

impl LatentWorkerController {
    /// Wire a controller from its parts. When `namespace` is None the
    /// cluster client's resolved default namespace is used.
    pub fn new(
        builder: WorkloadSpecBuilder,
        cluster: Arc<dyn ClusterClient>,
        namespace: Option<String>,
        stop_wait_timeout: Duration,
    ) -> Self {
        let identity = builder.identity().clone();
        let namespace = namespace.unwrap_or_else(|| cluster.namespace().to_string());
        Self {
            identity,
            namespace,
            builder,
            cluster,
            stop_wait_timeout,
            inner: Mutex::new(ControllerInner {
                state: ControllerState::Idle,
                current_spec: None,
                handle: None,
            }),
        }
    }

    /// Wire a controller from a validated configuration DTO
    pub fn from_config(
        config: &LatentWorkerConfig,
        cluster: Arc<dyn ClusterClient>,
    ) -> Result<Self, SharedError> {
        let identity = WorkerIdentity::new(&config.worker_name)?;
        let master_address = match &config.master_address {
            Some(address) => MasterAddress::literal(address),
            None => MasterAddress::default(),
        };
        let builder = WorkloadSpecBuilder::new(identity, &config.image)
            .with_master_address(master_address);

        Ok(Self::new(
            builder,
            cluster,
            config.namespace.clone(),
            Duration::from_secs(config.stop_wait_timeout_secs),
        ))
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Spec rendered for the current run, if one is active
    pub async fn rendered_spec(&self) -> Option<WorkloadSpec> {
        self.inner.lock().await.current_spec.clone()
    }

    /// Handle of the workload backing the current run, if any
    pub async fn workload_handle(&self) -> Option<WorkloadHandle> {
        self.inner.lock().await.handle.clone()
    }

    fn transition(&self, inner: &mut ControllerInner, to: ControllerState) {
        if !inner.state.can_transition_to(&to) {
            warn!(
                worker = %self.identity,
                from = %inner.state,
                to = %to,
                "Unexpected controller transition"
            );
        }
        debug!(worker = %self.identity, from = %inner.state, to = %to, "Controller transition");
        inner.state = to;
    }

    /// Decommission while already holding the controller lock.
    ///
    /// Ends in `Stopped` on every path, so a subsequent substantiate is
    /// always permitted. NotFound from the delete is treated as already
    /// absent and skips the wait; other delete errors surface only when
    /// `report_failure` is set. `fast` returns right after the delete
    /// request.
    async fn decommission_locked(
        &self,
        inner: &mut ControllerInner,
        fast: bool,
        report_failure: bool,
    ) -> Result<(), DecommissionError> {
        inner.current_spec = None;
        inner.handle = None;
        self.transition(inner, ControllerState::Stopping);

        let name = self.identity.workload_name();
        let mut already_absent = false;

        match self.cluster.delete_workload(&self.namespace, &name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(worker = %self.identity, "Workload already absent");
                already_absent = true;
            }
            Err(e) => {
                if report_failure {
                    self.transition(inner, ControllerState::Stopped);
                    return Err(DecommissionError::Cluster {
                        reason: e.to_string(),
                    });
                }
                warn!(worker = %self.identity, error = %e, "Ignoring workload deletion failure");
            }
        }

        if fast || already_absent {
            self.transition(inner, ControllerState::Stopped);
            return Ok(());
        }

        let result = self
            .cluster
            .wait_for_deletion(&self.namespace, &name, self.stop_wait_timeout)
            .await;
        self.transition(inner, ControllerState::Stopped);

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_timeout() => Err(DecommissionError::Timeout {
                timeout_secs: self.stop_wait_timeout.as_secs(),
            }),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(DecommissionError::Cluster {
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl LatentWorker for LatentWorkerController {
    async fn substantiate(&self, build: &dyn BuildContext) -> Result<bool, SubstantiateError> {
        let mut inner = self.inner.lock().await;

        if !inner.state.can_substantiate() {
            // The scheduler should not overlap calls; the cleanup below
            // still guarantees at most one live workload per identity.
            warn!(
                worker = %self.identity,
                state = %inner.state,
                "Substantiate requested while a workload may still be owned"
            );
        }

        // A stale workload from an unclean previous stop would collide with
        // the new one; remove it first, suppressing failures.
        if let Err(e) = self.decommission_locked(&mut inner, false, false).await {
            warn!(worker = %self.identity, error = %e, "Ignoring cleanup failure before substantiation");
        }

        let spec = match self.builder.build(build).await {
            Ok(spec) => spec,
            Err(e) => {
                warn!(worker = %self.identity, error = %e, "Workload spec rendering failed");
                return Err(e.into());
            }
        };

        inner.current_spec = Some(spec.clone());
        self.transition(&mut inner, ControllerState::Starting);
        info!(
            worker = %self.identity,
            build = %build.build_id(),
            image = %spec.image,
            namespace = %self.namespace,
            "Substantiating latent worker"
        );

        match self.cluster.create_workload(&self.namespace, &spec).await {
            Ok(handle) => {
                inner.handle = Some(handle);
                self.transition(&mut inner, ControllerState::Running);
                info!(worker = %self.identity, "Latent worker substantiated");
                Ok(true)
            }
            Err(e) => {
                self.transition(&mut inner, ControllerState::Stopped);
                Err(SubstantiateError::FailedToSubstantiate {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn stop_instance(
        &self,
        fast: bool,
        report_failure: bool,
    ) -> Result<(), DecommissionError> {
        let mut inner = self.inner.lock().await;
        info!(worker = %self.identity, fast, "Decommissioning latent worker");
        self.decommission_locked(&mut inner, fast, report_failure)
            .await
    }

    async fn state(&self) -> ControllerState {
        self.inner.lock().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sutegi_domain::shared_kernel::BuildId;
    use sutegi_domain::workers::PropertyBuildContext;
    use sutegi_infrastructure::cluster::InMemoryClusterClient;

    fn controller(cluster: Arc<InMemoryClusterClient>) -> LatentWorkerController {
        let config = LatentWorkerConfig::new("builder-01")
            .with_image("worker:latest")
            .with_namespace("ci")
            .with_stop_wait_timeout_secs(1);
        LatentWorkerController::from_config(&config, cluster).unwrap()
    }

    fn build() -> PropertyBuildContext {
        PropertyBuildContext::new(BuildId::new())
    }

    #[tokio::test]
    async fn test_substantiate_creates_workload_and_runs() {
        let cluster = Arc::new(InMemoryClusterClient::new("default"));
        let controller = controller(cluster.clone());

        assert_eq!(controller.state().await, ControllerState::Idle);
        assert!(controller.substantiate(&build()).await.unwrap());
        assert_eq!(controller.state().await, ControllerState::Running);
        assert!(cluster.contains("ci", "sutegi-worker-builder-01"));
        assert!(controller.rendered_spec().await.is_some());
        assert!(controller.workload_handle().await.is_some());
    }

    #[tokio::test]
    async fn test_namespace_falls_back_to_cluster_default() {
        let cluster = Arc::new(InMemoryClusterClient::new("default"));
        let config = LatentWorkerConfig::new("builder-01").with_image("worker:latest");
        let controller = LatentWorkerController::from_config(&config, cluster.clone()).unwrap();

        controller.substantiate(&build()).await.unwrap();
        assert!(cluster.contains("default", "sutegi-worker-builder-01"));
    }

    #[tokio::test]
    async fn test_decommission_clears_cached_spec() {
        let cluster = Arc::new(InMemoryClusterClient::new("default"));
        let controller = controller(cluster.clone());

        controller.substantiate(&build()).await.unwrap();
        assert!(controller.rendered_spec().await.is_some());

        controller.stop_instance(false, true).await.unwrap();
        assert!(controller.rendered_spec().await.is_none());
        assert!(controller.workload_handle().await.is_none());
        assert_eq!(controller.state().await, ControllerState::Stopped);
    }

    #[tokio::test]
    async fn test_render_failure_leaves_clean_state() {
        let cluster = Arc::new(InMemoryClusterClient::new("default"));
        let config = LatentWorkerConfig::new("builder-01")
            .with_image("worker:{tag}")
            .with_namespace("ci");
        let controller = LatentWorkerController::from_config(&config, cluster.clone()).unwrap();

        let err = controller.substantiate(&build()).await.unwrap_err();
        assert!(matches!(err, SubstantiateError::Render(_)));
        assert_eq!(controller.state().await, ControllerState::Stopped);
        assert_eq!(cluster.workload_count(), 0);

        // A corrected build can substantiate afterwards
        let ctx = build().with_property("tag", "latest");
        assert!(controller.substantiate(&ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_worker_name_is_rejected_at_wiring() {
        let cluster = Arc::new(InMemoryClusterClient::new("default"));
        let config = LatentWorkerConfig::new("Builder_01");
        assert!(LatentWorkerController::from_config(&config, cluster).is_err());
    }
}
