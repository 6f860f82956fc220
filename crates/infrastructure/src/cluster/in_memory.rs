//! In-memory cluster client
//!
//! In-process `ClusterClient` used by controller tests and local smoke runs.
//! Workloads live in a map keyed by namespace/name; failures for the next
//! create or delete call can be scripted, and deletions can be held back to
//! exercise the wait-for-deletion timeout path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use sutegi_domain::workers::{ClusterClient, ClusterError, WorkloadHandle, WorkloadSpec};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct InMemoryState {
    workloads: HashMap<String, WorkloadSpec>,
    fail_next_create: Option<ClusterError>,
    fail_next_delete: Option<ClusterError>,
    hold_deletions: bool,
    create_calls: u32,
    delete_calls: u32,
    wait_calls: u32,
}

/// Scriptable in-memory `ClusterClient`
pub struct InMemoryClusterClient {
    namespace: String,
    state: Mutex<InMemoryState>,
}

impl InMemoryClusterClient {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: Mutex::new(InMemoryState::default()),
        }
    }

    fn key(namespace: &str, name: &str) -> String {
        format!("{}/{}", namespace, name)
    }

    /// Script the next create call to fail with the given rejection reason
    pub fn fail_next_create(&self, reason: impl Into<String>, message: impl Into<String>) {
        self.state.lock().unwrap().fail_next_create = Some(ClusterError::Api {
            reason: reason.into(),
            message: message.into(),
        });
    }

    /// Script the next delete call to fail with the given error
    pub fn fail_next_delete(&self, error: ClusterError) {
        self.state.lock().unwrap().fail_next_delete = Some(error);
    }

    /// When set, delete requests are accepted but the workload lingers, so
    /// wait-for-deletion never confirms
    pub fn hold_deletions(&self, hold: bool) {
        self.state.lock().unwrap().hold_deletions = hold;
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .workloads
            .contains_key(&Self::key(namespace, name))
    }

    pub fn workload(&self, namespace: &str, name: &str) -> Option<WorkloadSpec> {
        self.state
            .lock()
            .unwrap()
            .workloads
            .get(&Self::key(namespace, name))
            .cloned()
    }

    pub fn workload_count(&self) -> usize {
        self.state.lock().unwrap().workloads.len()
    }

    pub fn create_calls(&self) -> u32 {
        self.state.lock().unwrap().create_calls
    }

    pub fn delete_calls(&self) -> u32 {
        self.state.lock().unwrap().delete_calls
    }

    pub fn wait_calls(&self) -> u32 {
        self.state.lock().unwrap().wait_calls
    }
}

#[async_trait]
impl ClusterClient for InMemoryClusterClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_workload(
        &self,
        namespace: &str,
        spec: &WorkloadSpec,
    ) -> Result<WorkloadHandle, ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;

        if let Some(err) = state.fail_next_create.take() {
            return Err(err);
        }

        let key = Self::key(namespace, &spec.name);
        if state.workloads.contains_key(&key) {
            return Err(ClusterError::Api {
                reason: "AlreadyExists".to_string(),
                message: format!("workload \"{}\" already exists", spec.name),
            });
        }

        state.workloads.insert(key, spec.clone());
        Ok(WorkloadHandle::new(spec.name.clone(), namespace))
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;

        if let Some(err) = state.fail_next_delete.take() {
            return Err(err);
        }

        let key = Self::key(namespace, name);
        if !state.workloads.contains_key(&key) {
            return Err(ClusterError::NotFound {
                name: name.to_string(),
            });
        }

        if !state.hold_deletions {
            state.workloads.remove(&key);
        }
        Ok(())
    }

    async fn wait_for_deletion(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), ClusterError> {
        {
            self.state.lock().unwrap().wait_calls += 1;
        }

        let key = Self::key(namespace, name);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let present = self.state.lock().unwrap().workloads.contains_key(&key);
            if !present {
                return Ok(());
            }
            if tokio::time::Instant::now() + POLL_INTERVAL > deadline {
                return Err(ClusterError::DeletionTimeout {
                    name: name.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
