//! Cluster client capability
//!
//! Minimal interface the latent worker controller needs from the
//! orchestration control plane: create a workload, delete it by name, and
//! wait for the cluster to confirm removal. Connection management,
//! authentication and retries belong to the implementation, not this
//! contract. Implementations must be safe for concurrent use by multiple
//! worker identities.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::workers::spec::WorkloadSpec;

/// Errors returned by the orchestration control plane
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    /// The named workload does not exist. Benign during decommission.
    #[error("Workload not found: {name}")]
    NotFound { name: String },

    /// The control plane rejected the request
    #[error("Cluster rejected request ({reason}): {message}")]
    Api { reason: String, message: String },

    /// The control plane could not be reached
    #[error("Cluster connection failed: {0}")]
    Connection(String),

    /// Client configuration is unusable
    #[error("Cluster configuration error: {0}")]
    Config(String),

    /// Deletion was not confirmed within the given bound
    #[error("Workload {name} still present after {timeout:?}")]
    DeletionTimeout { name: String, timeout: Duration },
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::DeletionTimeout { .. })
    }
}

/// Acknowledgment of a created workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadHandle {
    pub name: String,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
}

impl WorkloadHandle {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            created_at: Utc::now(),
        }
    }
}

/// Abstract create/delete/wait capability against the control plane
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Resolved default namespace, used when the worker has no override
    fn namespace(&self) -> &str;

    /// Submit a workload for creation. Returns once the control plane has
    /// accepted the spec; readiness is not awaited.
    async fn create_workload(
        &self,
        namespace: &str,
        spec: &WorkloadSpec,
    ) -> Result<WorkloadHandle, ClusterError>;

    /// Request deletion of a workload by name. `NotFound` signals the
    /// workload is already absent.
    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    /// Block until the workload is gone, bounded by `timeout`. The polling
    /// cadence is the implementation's concern.
    async fn wait_for_deletion(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err = ClusterError::NotFound {
            name: "sutegi-worker-builder-01".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_predicate() {
        let err = ClusterError::DeletionTimeout {
            name: "sutegi-worker-builder-01".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert!(err.is_timeout());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_api_error_carries_reason_in_message() {
        let err = ClusterError::Api {
            reason: "Forbidden".to_string(),
            message: "pods is forbidden in namespace ci".to_string(),
        };
        assert!(err.to_string().contains("Forbidden"));
    }

    #[test]
    fn test_handle_records_creation_time() {
        let handle = WorkloadHandle::new("sutegi-worker-builder-01", "ci");
        assert_eq!(handle.namespace, "ci");
        assert!(handle.created_at <= Utc::now());
    }
}
