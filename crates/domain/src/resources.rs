use crate::shared_kernel::{ConfigCommitId, ResourceId, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Resource type, stored as its canonical kind string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Pod,
    Service,
    Deployment,
    ConfigMap,
    Ingress,
    Job,
    CronJob,
    PersistentVolumeClaim,
    Secret,
    StatefulSet,
    DaemonSet,
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Pod => "Pod",
            ResourceType::Service => "Service",
            ResourceType::Deployment => "Deployment",
            ResourceType::ConfigMap => "ConfigMap",
            ResourceType::Ingress => "Ingress",
            ResourceType::Job => "Job",
            ResourceType::CronJob => "CronJob",
            ResourceType::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceType::Secret => "Secret",
            ResourceType::StatefulSet => "StatefulSet",
            ResourceType::DaemonSet => "DaemonSet",
            ResourceType::Other(kind) => kind,
        }
    }
}

impl From<String> for ResourceType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Pod" => ResourceType::Pod,
            "Service" => ResourceType::Service,
            "Deployment" => ResourceType::Deployment,
            "ConfigMap" => ResourceType::ConfigMap,
            "Ingress" => ResourceType::Ingress,
            "Job" => ResourceType::Job,
            "CronJob" => ResourceType::CronJob,
            "PersistentVolumeClaim" => ResourceType::PersistentVolumeClaim,
            "Secret" => ResourceType::Secret,
            "StatefulSet" => ResourceType::StatefulSet,
            "DaemonSet" => ResourceType::DaemonSet,
            _ => ResourceType::Other(kind),
        }
    }
}

impl From<&str> for ResourceType {
    fn from(kind: &str) -> Self {
        ResourceType::from(kind.to_string())
    }
}

impl From<ResourceType> for String {
    fn from(t: ResourceType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted manifest document of a configuration version.
/// `name` is unique within `config_commit_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub config_commit_id: ConfigCommitId,
    pub resource_type: ResourceType,
    pub name: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(
        config_commit_id: ConfigCommitId,
        resource_type: ResourceType,
        name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: ResourceId::new(),
            config_commit_id,
            resource_type,
            name: name.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Kind as written in the payload, falling back to the stored type
    pub fn kind(&self) -> &str {
        self.payload
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.resource_type.as_str())
    }
}

/// Write set produced by a sync pass, applied atomically by the repository
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceChangeSet {
    pub creates: Vec<Resource>,
    pub updates: Vec<Resource>,
    pub deletes: Vec<Resource>,
}

impl ResourceChangeSet {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn list_by_config(&self, config_commit_id: &ConfigCommitId) -> Result<Vec<Resource>>;

    async fn get_by_name(
        &self,
        config_commit_id: &ConfigCommitId,
        name: &str,
    ) -> Result<Option<Resource>>;

    /// Applies every create, update and delete or none of them
    async fn apply_changes(&self, changes: &ResourceChangeSet) -> Result<()>;
}
