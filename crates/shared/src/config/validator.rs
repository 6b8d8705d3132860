//! Configuration validation

use super::dto::{PlatformConfig, ReconcilerConfig, SchedulerConfig};
use super::error::{ConfigError, Result};

/// Validate a database URL format
pub fn validate_database_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(ConfigError::InvalidDatabaseUrl(
            "Database URL cannot be empty".to_string(),
        ));
    }

    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
        return Err(ConfigError::InvalidDatabaseUrl(format!(
            "Database URL must start with postgres:// or postgresql://, got: {}",
            url
        )));
    }

    Ok(())
}

pub fn validate_scheduler_config(config: &SchedulerConfig) -> Result<()> {
    if config.default_queue.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default queue name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// The backoff must start above zero and never exceed its own ceiling
pub fn validate_reconciler_config(config: &ReconcilerConfig) -> Result<()> {
    if config.backoff_floor_secs == 0 {
        return Err(ConfigError::Validation(
            "reconcile backoff floor must be greater than 0".to_string(),
        ));
    }
    if config.backoff_floor_secs > config.backoff_ceiling_secs {
        return Err(ConfigError::Validation(format!(
            "reconcile backoff floor ({}s) exceeds ceiling ({}s)",
            config.backoff_floor_secs, config.backoff_ceiling_secs
        )));
    }
    Ok(())
}

pub fn validate_platform_config(config: &PlatformConfig) -> Result<()> {
    validate_database_url(&config.database.url)?;

    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database max connections must be greater than 0".to_string(),
        ));
    }
    if config.kubernetes.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "kubernetes request timeout must be greater than 0".to_string(),
        ));
    }
    if config.storage.namespace_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "namespace prefix cannot be empty".to_string(),
        ));
    }

    validate_scheduler_config(&config.scheduler)?;
    validate_reconciler_config(&config.reconciler)?;

    Ok(())
}
