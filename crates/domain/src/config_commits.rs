use crate::resources::Resource;
use crate::shared_kernel::{ConfigCommitId, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A versioned raw manifest belonging to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigCommit {
    pub id: ConfigCommitId,
    pub project_id: String,
    pub author_id: String,
    pub message: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConfigCommit {
    pub fn new(
        project_id: impl Into<String>,
        author_id: impl Into<String>,
        message: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: ConfigCommitId::new(),
            project_id: project_id.into(),
            author_id: author_id.into(),
            message: message.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ConfigCommitRepository: Send + Sync {
    async fn create(&self, commit: &ConfigCommit) -> Result<()>;

    /// Stores a new commit together with its initial resources. Either
    /// both are stored or neither is.
    async fn create_with_resources(&self, commit: &ConfigCommit, resources: &[Resource]) -> Result<()>;

    async fn get(&self, id: &ConfigCommitId) -> Result<Option<ConfigCommit>>;

    async fn update_content(&self, id: &ConfigCommitId, content: &str, message: &str)
    -> Result<()>;

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<ConfigCommit>>;
}
