// Config Sync Use Cases
// Guarda versiones de configuración y mantiene sus recursos en sincronía

use super::diff::{SyncPlan, plan, sync};
use flashplane_domain::{
    AuditAction, AuditEntry, AuditRepository, ConfigCommit, ConfigCommitId,
    ConfigCommitRepository, DomainError, RequestContext, Resource, ResourceRepository, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const AUDIT_RESOURCE_TYPE: &str = "resource";

pub struct ConfigSyncService {
    commits: Arc<dyn ConfigCommitRepository>,
    resources: Arc<dyn ResourceRepository>,
    audit: Arc<dyn AuditRepository>,
}

impl ConfigSyncService {
    pub fn new(
        commits: Arc<dyn ConfigCommitRepository>,
        resources: Arc<dyn ResourceRepository>,
        audit: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            commits,
            resources,
            audit,
        }
    }

    /// Stores a new configuration and all of its resources in one write.
    /// The manifest is validated before anything is written.
    pub async fn create_commit(
        &self,
        ctx: &RequestContext,
        project_id: &str,
        author_id: &str,
        message: &str,
        content: &str,
    ) -> Result<(ConfigCommit, SyncPlan)> {
        let planned = plan(content)?;

        let commit = ConfigCommit::new(project_id, author_id, message, content);
        let result = sync(commit.id, &[], planned);
        self.commits
            .create_with_resources(&commit, &result.creates)
            .await?;
        self.record_changes(ctx, &result).await;

        info!(
            target: "flashplane::diff",
            commit_id = %commit.id,
            project_id = %project_id,
            changes = %result.summary(),
            "config commit created"
        );
        Ok((commit, result))
    }

    /// Re-plans a configuration from new content and applies the difference
    pub async fn update_commit(
        &self,
        ctx: &RequestContext,
        commit_id: &ConfigCommitId,
        content: &str,
        message: &str,
    ) -> Result<SyncPlan> {
        let commit = self
            .commits
            .get(commit_id)
            .await?
            .ok_or(DomainError::ConfigCommitNotFound {
                commit_id: *commit_id,
            })?;

        let planned = plan(content)?;
        let existing = self.resources.list_by_config(&commit.id).await?;
        let result = sync(commit.id, &existing, planned);

        self.apply(ctx, &result).await?;
        self.commits
            .update_content(&commit.id, content, message)
            .await?;

        info!(
            target: "flashplane::diff",
            commit_id = %commit.id,
            changes = %result.summary(),
            "config commit updated"
        );
        Ok(result)
    }

    pub async fn resources(&self, commit_id: &ConfigCommitId) -> Result<Vec<Resource>> {
        self.resources.list_by_config(commit_id).await
    }

    async fn apply(&self, ctx: &RequestContext, result: &SyncPlan) -> Result<()> {
        self.resources.apply_changes(&result.to_change_set()).await?;
        self.record_changes(ctx, result).await;
        Ok(())
    }

    async fn record_changes(&self, ctx: &RequestContext, result: &SyncPlan) {
        for created in &result.creates {
            self.record(
                ctx,
                AuditAction::Create,
                created,
                None,
                Some(created.payload.clone()),
            )
            .await;
        }
        for update in &result.updates {
            self.record(
                ctx,
                AuditAction::Update,
                &update.after,
                Some(update.before.payload.clone()),
                Some(update.after.payload.clone()),
            )
            .await;
        }
        for deleted in &result.deletes {
            self.record(
                ctx,
                AuditAction::Delete,
                deleted,
                Some(deleted.payload.clone()),
                None,
            )
            .await;
        }
    }

    async fn record(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        resource: &Resource,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) {
        let entry = AuditEntry::new(
            ctx,
            action,
            AUDIT_RESOURCE_TYPE,
            resource.id.to_string(),
            old_value,
            new_value,
            format!("{} {} {}", action, resource.resource_type, resource.name),
        );
        if let Err(e) = self.audit.save(&entry).await {
            warn!(target: "flashplane::diff", error = %e, resource = %resource.name, "failed to record audit entry");
        }
    }
}
