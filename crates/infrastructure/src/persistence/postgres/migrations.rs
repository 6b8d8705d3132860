use super::db_error;
use flashplane_domain::Result;
use sqlx::PgPool;
use tracing::info;

/// Idempotent schema setup, safe to run on every start
const STATEMENTS: &[(&str, &str)] = &[
    (
        "config_commits",
        r#"
        CREATE TABLE IF NOT EXISTS config_commits (
            id UUID PRIMARY KEY,
            project_id VARCHAR(255) NOT NULL,
            author_id VARCHAR(255) NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    ),
    (
        "config_commits project index",
        "CREATE INDEX IF NOT EXISTS idx_config_commits_project ON config_commits(project_id)",
    ),
    (
        "resources",
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            id UUID PRIMARY KEY,
            config_commit_id UUID NOT NULL REFERENCES config_commits(id) ON DELETE CASCADE,
            resource_type VARCHAR(100) NOT NULL,
            name VARCHAR(253) NOT NULL,
            payload JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE (config_commit_id, name)
        )
        "#,
    ),
    (
        "jobs",
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id VARCHAR(255) PRIMARY KEY,
            config_commit_id UUID,
            project_id VARCHAR(255) NOT NULL,
            namespace VARCHAR(63) NOT NULL,
            user_id VARCHAR(255) NOT NULL,
            status VARCHAR(20) NOT NULL,
            submit_type VARCHAR(20) NOT NULL,
            queue_name VARCHAR(255) NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            submitted_at TIMESTAMPTZ NOT NULL
        )
        "#,
    ),
    (
        "jobs project/status index",
        "CREATE INDEX IF NOT EXISTS idx_jobs_project_status ON jobs(project_id, status)",
    ),
    (
        "jobs user index",
        "CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id)",
    ),
    (
        "audit_logs",
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id UUID PRIMARY KEY,
            correlation_id VARCHAR(255),
            actor VARCHAR(255),
            action VARCHAR(20) NOT NULL,
            resource_type VARCHAR(100) NOT NULL,
            resource_id VARCHAR(255) NOT NULL,
            old_value JSONB,
            new_value JSONB,
            message TEXT NOT NULL DEFAULT '',
            occurred_at TIMESTAMPTZ NOT NULL
        )
        "#,
    ),
    (
        "audit_logs resource index",
        "CREATE INDEX IF NOT EXISTS idx_audit_resource ON audit_logs(resource_type, resource_id)",
    ),
    (
        "projects",
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id VARCHAR(255) PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            group_id VARCHAR(255) NOT NULL,
            max_job_runtime_seconds BIGINT,
            schedule_windows JSONB NOT NULL DEFAULT '[]'
        )
        "#,
    ),
    (
        "projects runtime limit",
        "ALTER TABLE projects ADD COLUMN IF NOT EXISTS max_job_runtime_seconds BIGINT",
    ),
    (
        "projects schedule windows",
        "ALTER TABLE projects ADD COLUMN IF NOT EXISTS schedule_windows JSONB NOT NULL DEFAULT '[]'",
    ),
    (
        "group_memberships",
        r#"
        CREATE TABLE IF NOT EXISTS group_memberships (
            user_id VARCHAR(255) NOT NULL,
            group_id VARCHAR(255) NOT NULL,
            role VARCHAR(50) NOT NULL,
            PRIMARY KEY (user_id, group_id)
        )
        "#,
    ),
    (
        "group_storages",
        r#"
        CREATE TABLE IF NOT EXISTS group_storages (
            id VARCHAR(255) PRIMARY KEY,
            group_id VARCHAR(255) NOT NULL,
            claim_name VARCHAR(253) NOT NULL,
            capacity_gi INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (group_id, claim_name)
        )
        "#,
    ),
    (
        "storage_permissions",
        r#"
        CREATE TABLE IF NOT EXISTS storage_permissions (
            group_id VARCHAR(255) NOT NULL,
            user_id VARCHAR(255) NOT NULL,
            storage_id VARCHAR(255) NOT NULL,
            permission VARCHAR(10) NOT NULL,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            PRIMARY KEY (group_id, user_id, storage_id)
        )
        "#,
    ),
];

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for (name, statement) in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| db_error(&format!("Failed to create {}", name), e))?;
    }
    info!(tables = 8, "database schema ready");
    Ok(())
}
