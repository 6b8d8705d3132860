//! Ports towards the Kubernetes API and the batch scheduler's custom
//! workload type, plus the typed views exchanged through them.

use crate::manifests::ObjectMetaView;
use crate::shared_kernel::{DomainError, JobStatus, Result};
use crate::storage::StorageBinding;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const WORKLOAD_GROUP: &str = "scheduling.flash-sched.io";
pub const WORKLOAD_API_VERSION: &str = "scheduling.flash-sched.io/v1alpha1";
pub const WORKLOAD_KIND: &str = "FlashJob";
pub const QUEUE_NAME_ANNOTATION: &str = "scheduling.flash-sched.io/queue-name";

/// Correlation labels written on workload objects and rendered resources
pub mod labels {
    pub const JOB_ID: &str = "platform.job-id";
    pub const PROJECT_ID: &str = "platform.project-id";
    pub const CONFIG_ID: &str = "platform.configfile-id";
    pub const CONFIG_COMMIT_ID: &str = "platform.configcommit-id";
    pub const USER_ID: &str = "platform.user-id";
    pub const USERNAME: &str = "platform.username";
}

/// Pod template submitted to the scheduler as one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodTemplate {
    #[serde(default)]
    pub metadata: ObjectMetaView,
    pub spec: Value,
}

impl PodTemplate {
    /// A Pod becomes a template made of its own metadata and spec
    pub fn from_pod(payload: &Value) -> Result<Self> {
        let metadata = match payload.get("metadata") {
            Some(meta) => ObjectMetaView::deserialize(meta)?,
            None => ObjectMetaView::default(),
        };
        let spec = payload.get("spec").cloned().unwrap_or(Value::Null);
        Self::checked(metadata, spec)
    }

    /// A Job contributes its `spec.template`
    pub fn from_job(payload: &Value) -> Result<Self> {
        let template = payload
            .pointer("/spec/template")
            .ok_or_else(|| DomainError::InvalidManifest {
                message: "job is missing spec.template".to_string(),
            })?;
        let template = PodTemplate::deserialize(template)?;
        Self::checked(template.metadata, template.spec)
    }

    fn checked(metadata: ObjectMetaView, spec: Value) -> Result<Self> {
        if !spec.is_object() {
            return Err(DomainError::InvalidManifest {
                message: "pod template has no spec".to_string(),
            });
        }
        Ok(Self { metadata, spec })
    }

    pub fn set_queue(&mut self, queue_name: &str) {
        self.metadata
            .annotations
            .insert(QUEUE_NAME_ANNOTATION.to_string(), queue_name.to_string());
    }

    pub fn set_scheduler_name(&mut self, scheduler_name: &str) {
        if let Some(spec) = self.spec.as_object_mut() {
            spec.insert(
                "schedulerName".to_string(),
                Value::String(scheduler_name.to_string()),
            );
        }
    }
}

/// Everything needed to create one scheduler-native workload object
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSubmission {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub min_available: i32,
    pub tasks: Vec<PodTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStatusView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<i32>,
}

/// Typed view of a scheduler-native workload object as read from the cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadObject {
    pub metadata: ObjectMetaView,
    #[serde(default)]
    pub status: Option<WorkloadStatusView>,
}

impl WorkloadObject {
    /// Converts a wire object. The name is what ties it to a job, so an
    /// object without one is rejected.
    pub fn from_wire(value: Value) -> Result<Self> {
        let object: WorkloadObject = serde_json::from_value(value)?;
        if object.name().is_empty() {
            return Err(DomainError::SerializationError {
                message: "workload object is missing metadata.name".to_string(),
            });
        }
        Ok(object)
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or_default()
    }

    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_phase(self.phase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Bookmark,
}

/// A watch event before conversion to `WorkloadObject`
#[derive(Debug, Clone, PartialEq)]
pub struct RawWorkloadEvent {
    pub event_type: WatchEventType,
    pub object: Value,
}

/// Pull-based stream of watch events. It ends when the server closes the watch.
pub type WorkloadEventStream = BoxStream<'static, Result<RawWorkloadEvent>>;

/// Namespaces, claims and plain objects
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Creates the namespace unless it already exists
    async fn ensure_namespace(&self, namespace: &str, project_id: &str) -> Result<()>;

    /// Binds an existing claim into another namespace without copying data
    async fn mount_existing_volume(&self, binding: &StorageBinding) -> Result<()>;

    /// Creates an arbitrary object in `namespace`
    async fn apply_object(&self, namespace: &str, object: &Value) -> Result<()>;

    /// Deletes the object described by `object` with background propagation.
    /// An object that is already gone counts as deleted.
    async fn delete_object(&self, namespace: &str, object: &Value) -> Result<()>;
}

/// The batch scheduler's custom workload type
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    async fn create(&self, submission: &WorkloadSubmission) -> Result<()>;

    async fn get(&self, namespace: &str, name: &str) -> Result<WorkloadObject>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;

    /// Every workload object across all namespaces
    async fn list_all(&self) -> Result<Vec<WorkloadObject>>;

    /// Opens a watch across all namespaces
    async fn watch_all(&self) -> Result<WorkloadEventStream>;
}
