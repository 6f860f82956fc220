//! Configuration Data Transfer Objects (DTOs)
//!
//! Immutable configuration loaded once at startup and handed to the
//! controller wiring. The DTO is the single source of truth for a latent
//! worker slot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default image used for build workers when none is configured.
pub const DEFAULT_WORKER_IMAGE: &str = "sutegi/sutegi-worker:latest";

/// Default bound for the deletion wait during decommission (seconds).
pub const DEFAULT_STOP_WAIT_TIMEOUT_SECS: u64 = 60;

/// Configuration DTO for one latent worker slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatentWorkerConfig {
    /// Stable worker name; also the base of the workload name in the cluster
    pub worker_name: String,

    /// Image reference for the build container. May contain `{property}`
    /// placeholders rendered per build.
    pub image: String,

    /// Namespace override. When None, the cluster client's resolved default
    /// namespace is used.
    pub namespace: Option<String>,

    /// Address workers use to reach the build master. When None, the local
    /// hostname is resolved at spec-build time.
    pub master_address: Option<String>,

    /// Cluster configuration source
    pub cluster: ClusterConfigSource,

    /// Bound for the deletion wait during decommission (seconds)
    pub stop_wait_timeout_secs: u64,
}

impl LatentWorkerConfig {
    pub fn new(worker_name: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
            image: DEFAULT_WORKER_IMAGE.to_string(),
            namespace: None,
            master_address: None,
            cluster: ClusterConfigSource::default(),
            stop_wait_timeout_secs: DEFAULT_STOP_WAIT_TIMEOUT_SECS,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_master_address(mut self, address: impl Into<String>) -> Self {
        self.master_address = Some(address.into());
        self
    }

    pub fn with_stop_wait_timeout_secs(mut self, secs: u64) -> Self {
        self.stop_wait_timeout_secs = secs;
        self
    }
}

/// Where the cluster client should take its credentials from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfigSource {
    /// Path to a kubeconfig file (None = in-cluster configuration)
    pub kubeconfig_path: Option<PathBuf>,
    /// Kubeconfig context to use (None = current-context)
    pub context: Option<String>,
}
