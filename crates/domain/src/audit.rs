use crate::request_context::RequestContext;
use crate::shared_kernel::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited mutation with its before and after payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub correlation_id: Option<String>,
    pub actor: Option<String>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        ctx: &RequestContext,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id: Some(ctx.correlation_id().to_string()),
            actor: ctx.get_actor().map(str::to_string),
            action,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            old_value,
            new_value,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait AuditRepository: Send + Sync {
    async fn save(&self, entry: &AuditEntry) -> Result<()>;

    async fn find_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Vec<AuditEntry>>;
}
