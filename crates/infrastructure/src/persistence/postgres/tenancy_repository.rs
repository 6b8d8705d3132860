// Tenancy Repository
// Lectura de proyectos, membresías, volúmenes de grupo y permisos.
// Estas tablas las mantienen otros servicios; aquí solo se consultan.

use super::db_error;
use flashplane_domain::{
    AccessPermission, GroupMembership, GroupMembershipRepository, GroupStorage,
    GroupStorageRepository, Project, ProjectRepository, Result, StoragePermission,
    StoragePermissionRepository,
};
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct PostgresTenancyRepository {
    pool: PgPool,
}

impl PostgresTenancyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_permission(value: &str) -> StoragePermission {
    match value {
        "write" => StoragePermission::Write,
        "read" => StoragePermission::Read,
        _ => StoragePermission::None,
    }
}

#[async_trait::async_trait]
impl ProjectRepository for PostgresTenancyRepository {
    async fn get(&self, project_id: &str) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, name, group_id, max_job_runtime_seconds, schedule_windows FROM projects WHERE id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find project", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let windows: serde_json::Value = row.get("schedule_windows");
        Ok(Some(Project {
            id: row.get("id"),
            name: row.get("name"),
            group_id: row.get("group_id"),
            max_job_runtime_seconds: row.get("max_job_runtime_seconds"),
            schedule_windows: serde_json::from_value(windows)?,
        }))
    }
}

#[async_trait::async_trait]
impl GroupMembershipRepository for PostgresTenancyRepository {
    async fn get(&self, user_id: &str, group_id: &str) -> Result<Option<GroupMembership>> {
        let row = sqlx::query(
            "SELECT user_id, group_id, role FROM group_memberships WHERE user_id = $1 AND group_id = $2",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find group membership", e))?;

        Ok(row.map(|row| GroupMembership {
            user_id: row.get("user_id"),
            group_id: row.get("group_id"),
            role: row.get("role"),
        }))
    }
}

#[async_trait::async_trait]
impl GroupStorageRepository for PostgresTenancyRepository {
    /// Oldest first, so the first entry is the group's default volume
    async fn list_by_group(&self, group_id: &str) -> Result<Vec<GroupStorage>> {
        let rows = sqlx::query(
            "SELECT id, group_id, claim_name, capacity_gi FROM group_storages WHERE group_id = $1 ORDER BY created_at, id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list group storages", e))?;

        Ok(rows
            .iter()
            .map(|row| GroupStorage {
                id: row.get("id"),
                group_id: row.get("group_id"),
                claim_name: row.get("claim_name"),
                capacity_gi: row.get("capacity_gi"),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl StoragePermissionRepository for PostgresTenancyRepository {
    async fn get_permission(
        &self,
        group_id: &str,
        user_id: &str,
        storage_id: &str,
    ) -> Result<Option<AccessPermission>> {
        let row = sqlx::query(
            r#"
            SELECT group_id, user_id, storage_id, permission, active
            FROM storage_permissions
            WHERE group_id = $1 AND user_id = $2 AND storage_id = $3
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(storage_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find storage permission", e))?;

        Ok(row.map(|row| {
            let permission: String = row.get("permission");
            AccessPermission {
                group_id: row.get("group_id"),
                user_id: row.get("user_id"),
                storage_id: row.get("storage_id"),
                permission: parse_permission(&permission),
                active: row.get("active"),
            }
        }))
    }
}
