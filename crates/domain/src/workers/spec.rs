//! Workload specification model
//!
//! `WorkloadSpec` is the cluster-agnostic description of what to run for one
//! build: a primary build container plus optional sidecars. It is built fresh
//! for every substantiation and never mutated afterwards; cluster-specific
//! payloads (resource requirements, affinity, volume sources) pass through as
//! opaque JSON so the spec stays infrastructure-neutral.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Restart policy for the workload. Build workloads always use `Never`: a
/// finished or failed build container must not be restarted by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::Never => write!(f, "Never"),
            RestartPolicy::OnFailure => write!(f, "OnFailure"),
            RestartPolicy::Always => write!(f, "Always"),
        }
    }
}

/// One environment entry. Order is preserved all the way to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

impl EnvEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Mount of a named volume into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMountSpec {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// A named volume with an opaque, cluster-specific source payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    /// Source description as the cluster understands it (e.g. an `emptyDir`
    /// or `persistentVolumeClaim` object). Passed through untyped.
    pub source: serde_json::Value,
}

/// Auxiliary (sidecar) container running alongside the build container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env: Vec<EnvEntry>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMountSpec>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: Vec::new(),
            command: Vec::new(),
            args: Vec::new(),
            volume_mounts: Vec::new(),
        }
    }
}

/// Immutable description of the workload backing one build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Workload name in the cluster; derived from the worker identity
    pub name: String,
    /// Image reference of the primary build container, fully rendered
    pub image: String,
    /// Environment of the primary container, in injection order
    pub env: Vec<EnvEntry>,
    /// Opaque resource requests/limits payload
    #[serde(default)]
    pub resources: serde_json::Value,
    /// Volume mounts of the primary container
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMountSpec>,
    /// Opaque affinity rules payload
    #[serde(default)]
    pub affinity: serde_json::Value,
    /// Node selector constraints
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    /// Restart policy; `Never` for build workloads
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    /// Sidecar containers, in declaration order
    #[serde(default)]
    pub sidecars: Vec<ContainerSpec>,
    /// Volumes available to all containers
    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,
    /// Labels applied to the workload
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl WorkloadSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            env: Vec::new(),
            resources: serde_json::Value::Object(Default::default()),
            volume_mounts: Vec::new(),
            affinity: serde_json::Value::Object(Default::default()),
            node_selector: BTreeMap::new(),
            restart_policy: RestartPolicy::Never,
            sidecars: Vec::new(),
            volumes: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvEntry::new(name, value));
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_sidecar(mut self, sidecar: ContainerSpec) -> Self {
        self.sidecars.push(sidecar);
        self
    }

    pub fn with_volume(mut self, volume: VolumeSpec) -> Self {
        self.volumes.push(volume);
        self
    }

    /// True when the opaque resources payload carries entries
    pub fn has_resources(&self) -> bool {
        !is_empty_payload(&self.resources)
    }

    /// True when the opaque affinity payload carries entries
    pub fn has_affinity(&self) -> bool {
        !is_empty_payload(&self.affinity)
    }
}

/// Missing opaque payloads arrive as `null` after deserialization; treat
/// them like an empty object.
fn is_empty_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(m) => m.is_empty(),
        _ => false,
    }
}
