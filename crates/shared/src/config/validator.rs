//! Configuration validation

use super::dto::LatentWorkerConfig;
use super::error::{ConfigError, Result};
use crate::ids::WorkerIdentity;

/// Validate a latent worker configuration
///
/// The worker name must be usable as a cluster object name, the image must
/// not be empty, and a configured namespace must be a plausible namespace
/// name. Cluster credentials are checked separately, by constructing the
/// cluster client once at startup.
pub fn validate_latent_worker_config(config: &LatentWorkerConfig) -> Result<()> {
    WorkerIdentity::new(&config.worker_name)
        .map_err(|e| ConfigError::Validation(e.to_string()))?;

    if config.image.trim().is_empty() {
        return Err(ConfigError::Validation(
            "worker image must not be empty".to_string(),
        ));
    }

    if let Some(namespace) = &config.namespace {
        validate_namespace(namespace)?;
    }

    if config.stop_wait_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "stop wait timeout must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() || namespace.len() > 63 {
        return Err(ConfigError::Validation(format!(
            "invalid namespace '{}': must be 1-63 characters",
            namespace
        )));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "invalid namespace '{}': only lowercase alphanumerics and '-' are allowed",
            namespace
        )));
    }
    Ok(())
}
