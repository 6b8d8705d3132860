// Persistence Layer
// Repositorios PostgreSQL (sqlx) y en memoria para tests

pub mod in_memory;
pub mod postgres;

pub use postgres::{
    PostgresAuditRepository, PostgresConfigCommitRepository, PostgresJobRepository,
    PostgresResourceRepository, PostgresTenancyRepository, connect, run_migrations,
};
