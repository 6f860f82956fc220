//! Configuration loader
//!
//! Loads latent worker configuration from an optional `.env` file and the
//! process environment, then validates it.

use std::path::Path;

use super::dto::{
    ClusterConfigSource, LatentWorkerConfig, DEFAULT_STOP_WAIT_TIMEOUT_SECS,
    DEFAULT_WORKER_IMAGE,
};
use super::error::{ConfigError, Result};
use super::validator::validate_latent_worker_config;

/// Configuration loader
///
/// Values from the `.env` file take precedence over the system environment,
/// which allows local development overrides without touching the shell.
///
/// # Example
///
/// ```ignore
/// use sutegi_shared::config::ConfigLoader;
///
/// let loader = ConfigLoader::new(Some(".env".into()));
/// let config = loader.load()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Optional path to .env file
    env_file_path: Option<std::path::PathBuf>,
}

impl ConfigLoader {
    pub fn new(env_file_path: Option<std::path::PathBuf>) -> Self {
        Self { env_file_path }
    }

    /// Load and validate the latent worker configuration
    pub fn load(&self) -> Result<LatentWorkerConfig> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let config = LatentWorkerConfig::from_env()?;
        validate_latent_worker_config(&config)?;

        Ok(config)
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConfigError::EnvFileLoad {
                path: path.to_path_buf(),
                source: dotenv::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                )),
            });
        }

        dotenv::from_path(path).map_err(|e| ConfigError::EnvFileLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LatentWorkerConfig {
    /// Build configuration from environment variables
    ///
    /// # Required Environment Variables
    ///
    /// - `SUTEGI_WORKER_NAME`: stable worker name
    ///
    /// # Optional Environment Variables
    ///
    /// - `SUTEGI_WORKER_IMAGE`: build container image (default placeholder image)
    /// - `SUTEGI_NAMESPACE`: namespace override
    /// - `SUTEGI_MASTER_ADDRESS`: master address workers connect back to
    /// - `SUTEGI_KUBECONFIG`: path to a kubeconfig file (default: in-cluster)
    /// - `SUTEGI_KUBE_CONTEXT`: kubeconfig context
    /// - `SUTEGI_STOP_WAIT_TIMEOUT_SECS`: deletion wait bound (default: 60)
    pub fn from_env() -> Result<Self> {
        let worker_name =
            std::env::var("SUTEGI_WORKER_NAME").map_err(|_| ConfigError::MissingRequired {
                var: "SUTEGI_WORKER_NAME".to_string(),
            })?;

        let image = std::env::var("SUTEGI_WORKER_IMAGE")
            .unwrap_or_else(|_| DEFAULT_WORKER_IMAGE.to_string());

        let namespace = std::env::var("SUTEGI_NAMESPACE").ok();
        let master_address = std::env::var("SUTEGI_MASTER_ADDRESS").ok();

        let cluster = ClusterConfigSource {
            kubeconfig_path: std::env::var("SUTEGI_KUBECONFIG").ok().map(Into::into),
            context: std::env::var("SUTEGI_KUBE_CONTEXT").ok(),
        };

        let stop_wait_timeout_secs = match std::env::var("SUTEGI_STOP_WAIT_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: "SUTEGI_STOP_WAIT_TIMEOUT_SECS".to_string(),
                value: raw.clone(),
            })?,
            Err(_) => DEFAULT_STOP_WAIT_TIMEOUT_SECS,
        };

        Ok(Self {
            worker_name,
            image,
            namespace,
            master_address,
            cluster,
            stop_wait_timeout_secs,
        })
    }
}
