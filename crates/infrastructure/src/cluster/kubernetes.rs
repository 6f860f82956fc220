//! Kubernetes cluster client
//!
//! kube-rs backed implementation of the `ClusterClient` capability. One
//! workload maps to one Pod. The client resolves its configuration from a
//! kubeconfig file (with optional context) or falls back to the in-cluster
//! environment.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Affinity, Container, EnvVar, Pod, PodSpec, ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Config};
use std::time::Duration;
use tracing::{debug, info};

use sutegi_domain::workers::{
    ClusterClient, ClusterError, ContainerSpec, WorkloadHandle, WorkloadSpec,
};
use sutegi_shared::config::ClusterConfigSource;

/// Interval between existence checks while waiting for a deletion.
const DELETION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// `ClusterClient` implementation over the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    /// Connect using the given configuration source. The default namespace
    /// is taken from the resolved kube configuration.
    pub async fn connect(source: &ClusterConfigSource) -> Result<Self, ClusterError> {
        let config = Self::resolve_config(source).await?;
        let namespace = config.default_namespace.clone();
        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Config(format!("Failed to create client: {}", e)))?;

        Ok(Self { client, namespace })
    }

    /// Validate a configuration source by resolving it and constructing a
    /// client, without retaining either. Called once at configuration time
    /// so malformed cluster config fails fast.
    pub async fn check_config(source: &ClusterConfigSource) -> Result<(), ClusterError> {
        let config = Self::resolve_config(source).await?;
        Client::try_from(config)
            .map_err(|e| ClusterError::Config(format!("Failed to create client: {}", e)))?;
        Ok(())
    }

    async fn resolve_config(source: &ClusterConfigSource) -> Result<Config, ClusterError> {
        match &source.kubeconfig_path {
            Some(path) => {
                let kubeconfig = kube::config::Kubeconfig::read_from(path).map_err(|e| {
                    ClusterError::Config(format!(
                        "Failed to read kubeconfig from {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let options = kube::config::KubeConfigOptions {
                    context: source.context.clone(),
                    cluster: None,
                    user: None,
                };
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| {
                        ClusterError::Config(format!("Failed to resolve kube config: {}", e))
                    })
            }
            None => Config::infer().await.map_err(|e| {
                ClusterError::Config(format!("Failed to infer kube config: {}", e))
            }),
        }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn map_api_error(err: kube::Error, name: &str) -> ClusterError {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => ClusterError::NotFound {
                name: name.to_string(),
            },
            kube::Error::Api(ae) => ClusterError::Api {
                reason: ae.reason,
                message: ae.message,
            },
            other => ClusterError::Connection(other.to_string()),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_workload(
        &self,
        namespace: &str,
        spec: &WorkloadSpec,
    ) -> Result<WorkloadHandle, ClusterError> {
        let pod = workload_to_pod(spec, namespace)?;

        self.pods(namespace)
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| Self::map_api_error(e, &spec.name))?;

        info!(workload = %spec.name, %namespace, "Workload created");
        Ok(WorkloadHandle::new(spec.name.clone(), namespace))
    }

    async fn delete_workload(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| Self::map_api_error(e, name))?;

        info!(workload = %name, %namespace, "Workload deletion requested");
        Ok(())
    }

    async fn wait_for_deletion(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<(), ClusterError> {
        let pods = self.pods(namespace);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let present = pods
                .get_opt(name)
                .await
                .map_err(|e| Self::map_api_error(e, name))?
                .is_some();
            if !present {
                debug!(workload = %name, %namespace, "Workload deletion confirmed");
                return Ok(());
            }
            if tokio::time::Instant::now() + DELETION_POLL_INTERVAL > deadline {
                return Err(ClusterError::DeletionTimeout {
                    name: name.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(DELETION_POLL_INTERVAL).await;
        }
    }
}

/// Translate a cluster-agnostic `WorkloadSpec` into a Pod. Sidecars come
/// first in the container list, the build container last.
pub fn workload_to_pod(spec: &WorkloadSpec, namespace: &str) -> Result<Pod, ClusterError> {
    let env: Vec<EnvVar> = spec
        .env
        .iter()
        .map(|e| EnvVar {
            name: e.name.clone(),
            value: Some(e.value.clone()),
            ..Default::default()
        })
        .collect();

    let resources: Option<ResourceRequirements> = if spec.has_resources() {
        Some(
            serde_json::from_value(spec.resources.clone())
                .map_err(|e| ClusterError::Config(format!("Invalid resources payload: {}", e)))?,
        )
    } else {
        None
    };

    let volume_mounts: Option<Vec<VolumeMount>> = if spec.volume_mounts.is_empty() {
        None
    } else {
        Some(
            spec.volume_mounts
                .iter()
                .map(|vm| VolumeMount {
                    name: vm.name.clone(),
                    mount_path: vm.mount_path.clone(),
                    read_only: Some(vm.read_only),
                    ..Default::default()
                })
                .collect(),
        )
    };

    let affinity: Option<Affinity> = if spec.has_affinity() {
        Some(
            serde_json::from_value(spec.affinity.clone())
                .map_err(|e| ClusterError::Config(format!("Invalid affinity payload: {}", e)))?,
        )
    } else {
        None
    };

    let volumes: Option<Vec<Volume>> = if spec.volumes.is_empty() {
        None
    } else {
        let mut converted = Vec::with_capacity(spec.volumes.len());
        for v in &spec.volumes {
            let serde_json::Value::Object(source) = v.source.clone() else {
                return Err(ClusterError::Config(format!(
                    "Invalid source payload for volume '{}'",
                    v.name
                )));
            };
            let mut object = source;
            object.insert("name".to_string(), serde_json::Value::String(v.name.clone()));
            let volume = serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
                ClusterError::Config(format!("Invalid source payload for volume '{}': {}", v.name, e))
            })?;
            converted.push(volume);
        }
        Some(converted)
    };

    let build_container = Container {
        name: "worker".to_string(),
        image: Some(spec.image.clone()),
        env: Some(env),
        resources,
        volume_mounts,
        image_pull_policy: Some("IfNotPresent".to_string()),
        ..Default::default()
    };

    let mut containers: Vec<Container> = spec.sidecars.iter().map(container_from_spec).collect();
    containers.push(build_container);

    let metadata = ObjectMeta {
        name: Some(spec.name.clone()),
        namespace: Some(namespace.to_string()),
        labels: if spec.labels.is_empty() {
            None
        } else {
            Some(spec.labels.clone())
        },
        ..Default::default()
    };

    Ok(Pod {
        metadata,
        spec: Some(PodSpec {
            containers,
            restart_policy: Some(spec.restart_policy.to_string()),
            node_selector: if spec.node_selector.is_empty() {
                None
            } else {
                Some(spec.node_selector.clone())
            },
            affinity,
            volumes,
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn container_from_spec(c: &ContainerSpec) -> Container {
    Container {
        name: c.name.clone(),
        image: Some(c.image.clone()),
        command: if c.command.is_empty() {
            None
        } else {
            Some(c.command.clone())
        },
        args: if c.args.is_empty() {
            None
        } else {
            Some(c.args.clone())
        },
        env: if c.env.is_empty() {
            None
        } else {
            Some(
                c.env
                    .iter()
                    .map(|e| EnvVar {
                        name: e.name.clone(),
                        value: Some(e.value.clone()),
                        ..Default::default()
                    })
                    .collect(),
            )
        },
        volume_mounts: if c.volume_mounts.is_empty() {
            None
        } else {
            Some(
                c.volume_mounts
                    .iter()
                    .map(|vm| VolumeMount {
                        name: vm.name.clone(),
                        mount_path: vm.mount_path.clone(),
                        read_only: Some(vm.read_only),
                        ..Default::default()
                    })
                    .collect(),
            )
        },
        ..Default::default()
    }
}
