//! Configuration loader
//!
//! Loads an optional `.env` file and then reads the process environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::dto::{
    DEFAULT_QUEUE, DatabaseConfig, KubernetesConfig, LoggingConfig, PlatformConfig,
    ReconcilerConfig, SchedulerConfig, StorageNamingConfig,
};
use super::error::{ConfigError, Result};
use super::validator::validate_platform_config;

/// Configuration loader
///
/// Values from the `.env` file are exported into the process environment
/// before the environment is read, so the same variable names apply to both.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_file_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(env_file_path: Option<PathBuf>) -> Self {
        Self { env_file_path }
    }

    /// Load, build and validate the platform configuration
    pub fn load_platform_config(&self) -> Result<PlatformConfig> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let config = PlatformConfig::from_env()?;
        validate_platform_config(&config)?;

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

impl PlatformConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            kubernetes: KubernetesConfig::from_env()?,
            scheduler: SchedulerConfig::from_env(),
            reconciler: ReconcilerConfig::from_env()?,
            storage: StorageNamingConfig::from_env(),
            logging: LoggingConfig::from_env(),
        })
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("FLASHPLANE_DATABASE_URL").map_err(|_| {
            ConfigError::MissingRequired {
                var: "FLASHPLANE_DATABASE_URL".to_string(),
            }
        })?;

        Ok(Self {
            url,
            max_connections: parse_optional_var("FLASHPLANE_DB_MAX_CONNECTIONS", 10)?,
            connection_timeout_secs: parse_optional_var(
                "FLASHPLANE_DB_CONNECTION_TIMEOUT_SECS",
                30,
            )?,
        })
    }
}

impl KubernetesConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            kubeconfig_path: optional_var("FLASHPLANE_KUBECONFIG").map(PathBuf::from),
            context: optional_var("FLASHPLANE_K8S_CONTEXT"),
            request_timeout_secs: parse_optional_var("FLASHPLANE_K8S_REQUEST_TIMEOUT_SECS", 10)?,
        })
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            default_queue: optional_var("FLASHPLANE_DEFAULT_QUEUE")
                .unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            scheduler_name: optional_var("FLASHPLANE_SCHEDULER_NAME"),
        }
    }
}

impl ReconcilerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            backoff_floor_secs: parse_optional_var("FLASHPLANE_RECONCILE_BACKOFF_FLOOR_SECS", 2)?,
            backoff_ceiling_secs: parse_optional_var(
                "FLASHPLANE_RECONCILE_BACKOFF_CEILING_SECS",
                60,
            )?,
        })
    }
}

impl StorageNamingConfig {
    pub fn from_env() -> Self {
        Self {
            namespace_prefix: optional_var("FLASHPLANE_NAMESPACE_PREFIX")
                .unwrap_or_else(|| "proj".to_string()),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: optional_var("FLASHPLANE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Reads a variable, treating unset and blank values the same way
fn optional_var(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional variable, rejecting values that are set but malformed
fn parse_optional_var<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
{
    match optional_var(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
            reason: "invalid format".to_string(),
        }),
    }
}
