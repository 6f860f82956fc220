//! Workload spec builder
//!
//! Assembles a fully rendered `WorkloadSpec` from a build context. The
//! builder owns the worker's static configuration (identity, image template,
//! master address) and a set of extension points; everything build-dependent
//! is rendered at `build()` time. No side effects.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::shared_kernel::WorkerIdentity;
use crate::workers::context::{BuildContext, RenderError};
use crate::workers::spec::{ContainerSpec, EnvEntry, VolumeMountSpec, VolumeSpec, WorkloadSpec};

/// Address that substantiated workers use to reach the build master.
///
/// Either a literal address or a resolver invoked at spec-build time. The
/// default resolver looks up the local hostname.
#[derive(Clone)]
pub enum MasterAddress {
    Literal(String),
    Resolver(Arc<dyn Fn() -> String + Send + Sync>),
}

impl MasterAddress {
    pub fn literal(address: impl Into<String>) -> Self {
        Self::Literal(address.into())
    }

    /// Resolver returning the local hostname
    pub fn local_hostname() -> Self {
        Self::Resolver(Arc::new(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string())
        }))
    }

    pub fn resolve(&self) -> String {
        match self {
            MasterAddress::Literal(address) => address.clone(),
            MasterAddress::Resolver(resolver) => resolver(),
        }
    }
}

impl Default for MasterAddress {
    fn default() -> Self {
        Self::local_hostname()
    }
}

impl fmt::Debug for MasterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterAddress::Literal(address) => f.debug_tuple("Literal").field(address).finish(),
            MasterAddress::Resolver(_) => f.debug_tuple("Resolver").field(&"<fn>").finish(),
        }
    }
}

/// Provider function for one extension point
pub type OverrideFn<T> = Arc<dyn Fn(&dyn BuildContext) -> T + Send + Sync>;

/// Extension points of the spec builder
///
/// Each provider is optional and defaults to an empty/neutral value, so a
/// deployment customizes only the aspects it cares about without touching the
/// builder's control flow.
#[derive(Clone, Default)]
pub struct SpecOverrides {
    pub resources: Option<OverrideFn<serde_json::Value>>,
    pub volume_mounts: Option<OverrideFn<Vec<VolumeMountSpec>>>,
    pub affinity: Option<OverrideFn<serde_json::Value>>,
    pub node_selector: Option<OverrideFn<BTreeMap<String, String>>>,
    pub sidecars: Option<OverrideFn<Vec<ContainerSpec>>>,
    pub volumes: Option<OverrideFn<Vec<VolumeSpec>>>,
}

impl SpecOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(
        mut self,
        f: impl Fn(&dyn BuildContext) -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        self.resources = Some(Arc::new(f));
        self
    }

    pub fn with_volume_mounts(
        mut self,
        f: impl Fn(&dyn BuildContext) -> Vec<VolumeMountSpec> + Send + Sync + 'static,
    ) -> Self {
        self.volume_mounts = Some(Arc::new(f));
        self
    }

    pub fn with_affinity(
        mut self,
        f: impl Fn(&dyn BuildContext) -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        self.affinity = Some(Arc::new(f));
        self
    }

    pub fn with_node_selector(
        mut self,
        f: impl Fn(&dyn BuildContext) -> BTreeMap<String, String> + Send + Sync + 'static,
    ) -> Self {
        self.node_selector = Some(Arc::new(f));
        self
    }

    pub fn with_sidecars(
        mut self,
        f: impl Fn(&dyn BuildContext) -> Vec<ContainerSpec> + Send + Sync + 'static,
    ) -> Self {
        self.sidecars = Some(Arc::new(f));
        self
    }

    pub fn with_volumes(
        mut self,
        f: impl Fn(&dyn BuildContext) -> Vec<VolumeSpec> + Send + Sync + 'static,
    ) -> Self {
        self.volumes = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SpecOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecOverrides")
            .field("resources", &self.resources.is_some())
            .field("volume_mounts", &self.volume_mounts.is_some())
            .field("affinity", &self.affinity.is_some())
            .field("node_selector", &self.node_selector.is_some())
            .field("sidecars", &self.sidecars.is_some())
            .field("volumes", &self.volumes.is_some())
            .finish()
    }
}

/// Builds `WorkloadSpec`s for one latent worker
#[derive(Debug, Clone)]
pub struct WorkloadSpecBuilder {
    identity: WorkerIdentity,
    image_template: String,
    master_address: MasterAddress,
    /// Additional environment, rendered per build; order preserved
    env_templates: Vec<(String, String)>,
    overrides: SpecOverrides,
}

impl WorkloadSpecBuilder {
    pub fn new(identity: WorkerIdentity, image_template: impl Into<String>) -> Self {
        Self {
            identity,
            image_template: image_template.into(),
            master_address: MasterAddress::default(),
            env_templates: Vec::new(),
            overrides: SpecOverrides::default(),
        }
    }

    pub fn with_master_address(mut self, address: MasterAddress) -> Self {
        self.master_address = address;
        self
    }

    pub fn with_env_template(
        mut self,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.env_templates.push((name.into(), template.into()));
        self
    }

    pub fn with_overrides(mut self, overrides: SpecOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Assemble a fully resolved spec for the given build.
    ///
    /// Fails with `RenderError` when any templated field references a
    /// property the build does not carry; the error propagates to the
    /// substantiation attempt.
    pub async fn build(&self, ctx: &dyn BuildContext) -> Result<WorkloadSpec, RenderError> {
        let image = ctx.render(&self.image_template).await?;

        let mut spec = WorkloadSpec::new(self.identity.workload_name(), image);

        spec.env
            .push(EnvEntry::new("SUTEGI_WORKER_NAME", self.identity.as_str()));
        spec.env.push(EnvEntry::new(
            "SUTEGI_MASTER_ADDRESS",
            self.master_address.resolve(),
        ));
        spec.env
            .push(EnvEntry::new("SUTEGI_BUILD_ID", ctx.build_id().to_string()));

        for (name, template) in &self.env_templates {
            let value = ctx.render(template).await?;
            spec.env.push(EnvEntry::new(name.clone(), value));
        }

        spec.labels
            .insert("sutegi.io/worker".to_string(), self.identity.to_string());
        spec.labels
            .insert("sutegi.io/managed".to_string(), "true".to_string());

        if let Some(resources) = &self.overrides.resources {
            spec.resources = resources(ctx);
        }
        if let Some(volume_mounts) = &self.overrides.volume_mounts {
            spec.volume_mounts = volume_mounts(ctx);
        }
        if let Some(affinity) = &self.overrides.affinity {
            spec.affinity = affinity(ctx);
        }
        if let Some(node_selector) = &self.overrides.node_selector {
            spec.node_selector = node_selector(ctx);
        }
        if let Some(sidecars) = &self.overrides.sidecars {
            spec.sidecars = sidecars(ctx);
        }
        if let Some(volumes) = &self.overrides.volumes {
            spec.volumes = volumes(ctx);
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_kernel::BuildId;
    use crate::workers::context::PropertyBuildContext;
    use crate::workers::spec::RestartPolicy;

    fn identity() -> WorkerIdentity {
        WorkerIdentity::new("builder-01").unwrap()
    }

    fn context() -> PropertyBuildContext {
        PropertyBuildContext::new(BuildId::new()).with_property("branch", "main")
    }

    #[tokio::test]
    async fn test_build_renders_image_template() {
        let builder = WorkloadSpecBuilder::new(identity(), "worker:{branch}");
        let spec = builder.build(&context()).await.unwrap();
        assert_eq!(spec.image, "worker:main");
        assert_eq!(spec.name, "sutegi-worker-builder-01");
        assert_eq!(spec.restart_policy, RestartPolicy::Never);
    }

    #[tokio::test]
    async fn test_build_injects_default_environment_first() {
        let ctx = context();
        let builder = WorkloadSpecBuilder::new(identity(), "worker:latest")
            .with_master_address(MasterAddress::literal("master.ci.local:9989"))
            .with_env_template("BRANCH", "{branch}");
        let spec = builder.build(&ctx).await.unwrap();

        let names: Vec<&str> = spec.env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "SUTEGI_WORKER_NAME",
                "SUTEGI_MASTER_ADDRESS",
                "SUTEGI_BUILD_ID",
                "BRANCH"
            ]
        );
        assert_eq!(spec.env[0].value, "builder-01");
        assert_eq!(spec.env[1].value, "master.ci.local:9989");
        assert_eq!(spec.env[2].value, ctx.build_id().to_string());
        assert_eq!(spec.env[3].value, "main");
    }

    #[tokio::test]
    async fn test_build_default_extension_points_are_neutral() {
        let builder = WorkloadSpecBuilder::new(identity(), "worker:latest");
        let spec = builder.build(&context()).await.unwrap();
        assert!(!spec.has_resources());
        assert!(spec.volume_mounts.is_empty());
        assert!(spec.node_selector.is_empty());
        assert!(spec.sidecars.is_empty());
        assert!(spec.volumes.is_empty());
    }

    #[tokio::test]
    async fn test_build_applies_overrides() {
        let overrides = SpecOverrides::new()
            .with_resources(|_| serde_json::json!({"limits": {"cpu": "2"}}))
            .with_node_selector(|_| {
                BTreeMap::from([("disktype".to_string(), "ssd".to_string())])
            })
            .with_sidecars(|_| vec![ContainerSpec::new("cache", "redis:7")]);

        let builder =
            WorkloadSpecBuilder::new(identity(), "worker:latest").with_overrides(overrides);
        let spec = builder.build(&context()).await.unwrap();

        assert!(spec.has_resources());
        assert_eq!(spec.node_selector.get("disktype").unwrap(), "ssd");
        assert_eq!(spec.sidecars.len(), 1);
        assert_eq!(spec.sidecars[0].name, "cache");
    }

    #[tokio::test]
    async fn test_build_missing_property_propagates() {
        let builder = WorkloadSpecBuilder::new(identity(), "worker:{tag}");
        let err = builder.build(&context()).await.unwrap_err();
        assert!(matches!(err, RenderError::MissingProperty { ref name, .. } if name == "tag"));
    }

    #[tokio::test]
    async fn test_build_labels_carry_worker_identity() {
        let builder = WorkloadSpecBuilder::new(identity(), "worker:latest");
        let spec = builder.build(&context()).await.unwrap();
        assert_eq!(spec.labels.get("sutegi.io/worker").unwrap(), "builder-01");
        assert_eq!(spec.labels.get("sutegi.io/managed").unwrap(), "true");
    }

    #[test]
    fn test_master_address_resolver_runs_at_resolve_time() {
        let address = MasterAddress::Resolver(Arc::new(|| "resolved.local".to_string()));
        assert_eq!(address.resolve(), "resolved.local");
    }

    #[test]
    fn test_master_address_default_resolves_to_something() {
        assert!(!MasterAddress::default().resolve().is_empty());
    }
}
