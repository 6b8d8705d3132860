use super::db_error;
use super::resource_repository::insert_resource;
use flashplane_domain::{
    ConfigCommit, ConfigCommitId, ConfigCommitRepository, DomainError, Resource, Result,
};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

async fn insert_commit(conn: &mut PgConnection, commit: &ConfigCommit) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO config_commits (id, project_id, author_id, message, content, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(commit.id.as_uuid())
    .bind(&commit.project_id)
    .bind(&commit.author_id)
    .bind(&commit.message)
    .bind(&commit.content)
    .bind(commit.created_at)
    .execute(conn)
    .await
    .map_err(|e| db_error("Failed to create config commit", e))?;
    Ok(())
}

#[derive(Clone)]
pub struct PostgresConfigCommitRepository {
    pool: PgPool,
}

impl PostgresConfigCommitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_commit(row: &PgRow) -> ConfigCommit {
        ConfigCommit {
            id: ConfigCommitId::from_uuid(row.get("id")),
            project_id: row.get("project_id"),
            author_id: row.get("author_id"),
            message: row.get("message"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait::async_trait]
impl ConfigCommitRepository for PostgresConfigCommitRepository {
    async fn create(&self, commit: &ConfigCommit) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))?;
        insert_commit(&mut conn, commit).await
    }

    async fn create_with_resources(&self, commit: &ConfigCommit, resources: &[Resource]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        insert_commit(&mut tx, commit).await?;
        for resource in resources {
            insert_resource(&mut tx, resource).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit config commit", e))
    }

    async fn get(&self, id: &ConfigCommitId) -> Result<Option<ConfigCommit>> {
        let row = sqlx::query("SELECT * FROM config_commits WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find config commit", e))?;
        Ok(row.as_ref().map(Self::row_to_commit))
    }

    async fn update_content(&self, id: &ConfigCommitId, content: &str, message: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE config_commits SET content = $1, message = $2 WHERE id = $3")
                .bind(content)
                .bind(message)
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to update config commit", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::ConfigCommitNotFound { commit_id: *id });
        }
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<ConfigCommit>> {
        let rows = sqlx::query(
            "SELECT * FROM config_commits WHERE project_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list config commits", e))?;
        Ok(rows.iter().map(Self::row_to_commit).collect())
    }
}
