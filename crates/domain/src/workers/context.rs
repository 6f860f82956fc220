//! Build context capability
//!
//! The owning scheduler hands the controller a build context: access to the
//! build's property map, template rendering, and the build's identity. The
//! spec builder renders templated fields (image tag, per-build environment)
//! against it. Rendering is async because property sources may live outside
//! the process.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::shared_kernel::BuildId;

/// Errors raised while rendering templated values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Missing property '{name}' while rendering '{template}'")]
    MissingProperty { name: String, template: String },

    #[error("Unclosed placeholder in template '{template}'")]
    UnclosedPlaceholder { template: String },
}

/// Capability the scheduler supplies per build
#[async_trait]
pub trait BuildContext: Send + Sync {
    /// The build's public identity
    fn build_id(&self) -> &BuildId;

    /// Direct property access
    fn property(&self, name: &str) -> Option<String>;

    /// Render a template, substituting `{name}` placeholders from the
    /// property map. Fails when a referenced property is absent.
    async fn render(&self, template: &str) -> Result<String, RenderError>;
}

/// Build context backed by an in-memory property map
#[derive(Debug, Clone, Default)]
pub struct PropertyBuildContext {
    build_id: BuildId,
    properties: HashMap<String, String>,
}

impl PropertyBuildContext {
    pub fn new(build_id: BuildId) -> Self {
        Self {
            build_id,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl BuildContext for PropertyBuildContext {
    fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    async fn render(&self, template: &str) -> Result<String, RenderError> {
        render_with(template, |name| self.properties.get(name).cloned())
    }
}

/// Substitute `{name}` placeholders using the given lookup
pub fn render_with(
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let close = after_open
            .find('}')
            .ok_or_else(|| RenderError::UnclosedPlaceholder {
                template: template.to_string(),
            })?;
        let name = &after_open[..close];
        let value = lookup(name).ok_or_else(|| RenderError::MissingProperty {
            name: name.to_string(),
            template: template.to_string(),
        })?;
        out.push_str(&value);
        rest = &after_open[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
