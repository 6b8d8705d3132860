//! PostgreSQL repositories.
//!
//! Each repository owns a clone of the pool. Every status write is a
//! single-row statement; `apply_changes` and `create_with_resources` span
//! a transaction.

mod audit_repository;
mod config_commit_repository;
mod job_repository;
mod migrations;
mod resource_repository;
mod tenancy_repository;

pub use audit_repository::PostgresAuditRepository;
pub use config_commit_repository::PostgresConfigCommitRepository;
pub use job_repository::PostgresJobRepository;
pub use migrations::run_migrations;
pub use resource_repository::PostgresResourceRepository;
pub use tenancy_repository::PostgresTenancyRepository;

use flashplane_domain::{DomainError, Result};
use flashplane_shared::config::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::PersistenceError {
            message: format!("Failed to connect to database: {}", e),
        })
}

pub(crate) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::PersistenceError {
        message: format!("{}: {}", context, err),
    }
}
