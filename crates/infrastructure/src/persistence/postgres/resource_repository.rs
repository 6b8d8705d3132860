use super::db_error;
use flashplane_domain::{
    ConfigCommitId, Resource, ResourceChangeSet, ResourceId, ResourceRepository, ResourceType,
    Result,
};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

pub(super) async fn insert_resource(conn: &mut PgConnection, resource: &Resource) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO resources (id, config_commit_id, resource_type, name, payload, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(resource.id.0)
    .bind(resource.config_commit_id.as_uuid())
    .bind(resource.resource_type.as_str())
    .bind(&resource.name)
    .bind(&resource.payload)
    .bind(resource.created_at)
    .execute(conn)
    .await
    .map_err(|e| db_error("Failed to create resource", e))?;
    Ok(())
}

#[derive(Clone)]
pub struct PostgresResourceRepository {
    pool: PgPool,
}

impl PostgresResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_resource(row: &PgRow) -> Resource {
        let resource_type: String = row.get("resource_type");
        Resource {
            id: ResourceId::from_uuid(row.get("id")),
            config_commit_id: ConfigCommitId::from_uuid(row.get("config_commit_id")),
            resource_type: ResourceType::from(resource_type),
            name: row.get("name"),
            payload: row.get("payload"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait::async_trait]
impl ResourceRepository for PostgresResourceRepository {
    async fn list_by_config(&self, config_commit_id: &ConfigCommitId) -> Result<Vec<Resource>> {
        let rows = sqlx::query(
            "SELECT * FROM resources WHERE config_commit_id = $1 ORDER BY created_at, name",
        )
        .bind(config_commit_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list resources", e))?;
        Ok(rows.iter().map(Self::row_to_resource).collect())
    }

    async fn get_by_name(
        &self,
        config_commit_id: &ConfigCommitId,
        name: &str,
    ) -> Result<Option<Resource>> {
        let row = sqlx::query("SELECT * FROM resources WHERE config_commit_id = $1 AND name = $2")
            .bind(config_commit_id.as_uuid())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find resource", e))?;
        Ok(row.as_ref().map(Self::row_to_resource))
    }

    /// All or nothing: the whole change set runs in one transaction
    async fn apply_changes(&self, changes: &ResourceChangeSet) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        for resource in &changes.deletes {
            sqlx::query("DELETE FROM resources WHERE id = $1")
                .bind(resource.id.0)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to delete resource", e))?;
        }

        for resource in &changes.updates {
            sqlx::query(
                "UPDATE resources SET resource_type = $1, payload = $2 WHERE id = $3",
            )
            .bind(resource.resource_type.as_str())
            .bind(&resource.payload)
            .bind(resource.id.0)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to update resource", e))?;
        }

        for resource in &changes.creates {
            insert_resource(&mut tx, resource).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit resource changes", e))
    }
}
