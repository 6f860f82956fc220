//! Latent worker contract
//!
//! Seam between the owning build scheduler and a worker lifecycle
//! controller. The scheduler never sees orchestration-specific error shapes:
//! every cluster-level rejection during substantiation surfaces as one
//! uniform failure type carrying a human-readable reason.

use async_trait::async_trait;
use thiserror::Error;

use crate::shared_kernel::ControllerState;
use crate::workers::context::{BuildContext, RenderError};

/// Failure of a substantiation attempt. Terminal for the attempt; the
/// scheduler decides whether to try again.
#[derive(Error, Debug, Clone)]
pub enum SubstantiateError {
    /// Uniform wrapper around any cluster-level rejection
    #[error("Latent worker failed to substantiate: {reason}")]
    FailedToSubstantiate { reason: String },

    /// A templated field could not be resolved for this build
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failure of a decommission call. Local state is clean afterwards either
/// way; a subsequent substantiate is always permitted.
#[derive(Error, Debug, Clone)]
pub enum DecommissionError {
    /// The control plane rejected the deletion request
    #[error("Failed to decommission worker: {reason}")]
    Cluster { reason: String },

    /// The cluster did not confirm removal within the configured bound
    #[error("Worker workload still present after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Lifecycle contract exposed to the owning scheduler
#[async_trait]
pub trait LatentWorker: Send + Sync {
    /// Bring the worker's backing workload into existence for one build.
    /// Returns `Ok(true)` once the cluster has acknowledged creation. Any
    /// stale workload left by a previous run is removed first, so at most
    /// one workload is live per identity at any time.
    async fn substantiate(&self, build: &dyn BuildContext) -> Result<bool, SubstantiateError>;

    /// Tear down the backing workload. `fast` returns right after the
    /// deletion request without waiting for confirmation; `report_failure`
    /// controls whether non-benign deletion errors are surfaced.
    async fn stop_instance(
        &self,
        fast: bool,
        report_failure: bool,
    ) -> Result<(), DecommissionError>;

    /// Current lifecycle state of this worker's controller
    async fn state(&self) -> ControllerState;
}
