//! Process configuration for Flashplane
//!
//! Configuration is loaded once at startup and handed to each component
//! through its constructor.
//!
//! ```ignore
//! use flashplane_shared::config::ConfigLoader;
//! use std::path::PathBuf;
//!
//! let loader = ConfigLoader::new(Some(PathBuf::from(".env")));
//! let config = loader.load_platform_config()?;
//! println!("default queue: {}", config.scheduler.default_queue);
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//!
//! - `FLASHPLANE_DATABASE_URL`: PostgreSQL connection string
//!
//! ## Optional
//!
//! - `FLASHPLANE_DB_MAX_CONNECTIONS` (default: 10)
//! - `FLASHPLANE_DB_CONNECTION_TIMEOUT_SECS` (default: 30)
//! - `FLASHPLANE_KUBECONFIG`, `FLASHPLANE_K8S_CONTEXT`
//! - `FLASHPLANE_K8S_REQUEST_TIMEOUT_SECS` (default: 10)
//! - `FLASHPLANE_DEFAULT_QUEUE` (default: "default-batch")
//! - `FLASHPLANE_SCHEDULER_NAME`
//! - `FLASHPLANE_RECONCILE_BACKOFF_FLOOR_SECS` (default: 2)
//! - `FLASHPLANE_RECONCILE_BACKOFF_CEILING_SECS` (default: 60)
//! - `FLASHPLANE_NAMESPACE_PREFIX` (default: "proj")
//! - `FLASHPLANE_LOG_LEVEL` (default: "info")

pub mod dto;
pub mod error;
pub mod loader;
pub mod validator;

pub use dto::{
    DatabaseConfig, KubernetesConfig, LoggingConfig, PlatformConfig, ReconcilerConfig,
    SchedulerConfig, StorageNamingConfig,
};
pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use validator::{
    validate_database_url, validate_platform_config, validate_reconciler_config,
    validate_scheduler_config,
};
