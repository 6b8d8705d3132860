use super::db_error;
use flashplane_domain::{AuditAction, AuditEntry, AuditRepository, Result};
use sqlx::{PgPool, Row, postgres::PgRow};

#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &PgRow) -> AuditEntry {
        let action: String = row.get("action");
        AuditEntry {
            id: row.get("id"),
            correlation_id: row.get("correlation_id"),
            actor: row.get("actor"),
            action: match action.as_str() {
                "create" => AuditAction::Create,
                "delete" => AuditAction::Delete,
                _ => AuditAction::Update,
            },
            resource_type: row.get("resource_type"),
            resource_id: row.get("resource_id"),
            old_value: row.get("old_value"),
            new_value: row.get("new_value"),
            message: row.get("message"),
            occurred_at: row.get("occurred_at"),
        }
    }
}

#[async_trait::async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn save(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, correlation_id, actor, action, resource_type, resource_id,
                 old_value, new_value, message, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.correlation_id)
        .bind(&entry.actor)
        .bind(entry.action.as_str())
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(&entry.message)
        .bind(entry.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save audit entry", e))?;
        Ok(())
    }

    async fn find_by_resource(&self, resource_type: &str, resource_id: &str) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM audit_logs WHERE resource_type = $1 AND resource_id = $2 ORDER BY occurred_at ASC",
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find audit entries", e))?;
        Ok(rows.iter().map(Self::row_to_entry).collect())
    }
}
