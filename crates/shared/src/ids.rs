use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::SharedError;

/// Identificador único para builds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(pub Uuid);

impl BuildId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable name of a latent worker, used as the workload name in the cluster
/// and as the key for delete/wait operations.
///
/// The name must be a valid DNS-1123 label (lowercase alphanumerics and `-`,
/// starting and ending with an alphanumeric, at most 63 characters) so that
/// the orchestrator accepts it as an object name. Successive substantiations
/// of the same worker slot reuse the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerIdentity(String);

impl WorkerIdentity {
    pub fn new(name: impl Into<String>) -> Result<Self, SharedError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the workload backing this worker.
    pub fn workload_name(&self) -> String {
        format!("sutegi-worker-{}", self.0)
    }

    fn validate(name: &str) -> Result<(), SharedError> {
        let invalid = |reason: &str| SharedError::InvalidWorkerName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        // The "sutegi-worker-" prefix also counts against the DNS-1123 limit.
        if name.len() > 49 {
            return Err(invalid("name longer than 49 characters"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(invalid(
                "only lowercase alphanumerics and '-' are allowed",
            ));
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(invalid("name cannot start or end with '-'"));
        }
        Ok(())
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
