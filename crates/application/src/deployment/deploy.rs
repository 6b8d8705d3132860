// Deploy Config Use Case
// Lleva una versión de configuración guardada hasta el scheduler:
// namespace, horario del proyecto, volúmenes, plantillas y envío.
// También retira del cluster lo que una versión desplegó.

use super::binder::{BoundVolumes, DeploymentBinder};
use super::templates::{
    apply_job_deadline, default_queue_for_resources, enforce_read_only, inject_job_labels,
    render_placeholders,
};
use crate::executor::{ResourcePayload, SchedulerExecutor, SubmitRequest, SubmitResponse};
use chrono::{DateTime, Utc};
use flashplane_domain::{
    ConfigCommit, ConfigCommitId, ConfigCommitRepository, DomainError, Identity, JobId,
    RequestContext, Resource, ResourceRepository, Result, SubmitType, is_time_allowed,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub config_commit_id: ConfigCommitId,
    pub identity: Identity,
    pub submit_type: SubmitType,
    pub queue_name: Option<String>,
    pub priority: i32,
}

pub struct DeployConfigUseCase {
    commits: Arc<dyn ConfigCommitRepository>,
    resources: Arc<dyn ResourceRepository>,
    binder: Arc<DeploymentBinder>,
    executor: Arc<SchedulerExecutor>,
    clock: fn() -> DateTime<Utc>,
}

impl DeployConfigUseCase {
    pub fn new(
        commits: Arc<dyn ConfigCommitRepository>,
        resources: Arc<dyn ResourceRepository>,
        binder: Arc<DeploymentBinder>,
        executor: Arc<SchedulerExecutor>,
    ) -> Self {
        Self {
            commits,
            resources,
            binder,
            executor,
            clock: Utc::now,
        }
    }

    /// Replaces the wall clock used for the project schedule check
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn execute(&self, ctx: &RequestContext, request: DeployRequest) -> Result<SubmitResponse> {
        let commit = self.load_commit(&request.config_commit_id).await?;

        let stored = self.resources.list_by_config(&commit.id).await?;
        let resources = filter_by_submit_type(stored, request.submit_type)?;

        let (namespace, project) = self.binder.prepare_namespace(&commit, &request.identity).await?;
        if !is_time_allowed(&project.schedule_windows, (self.clock)())? {
            return Err(DomainError::OutsideSchedule {
                project_id: project.id,
            });
        }
        let job_id = JobId::new();

        let volumes = self
            .binder
            .bind_volumes(&namespace, &project, &request.identity, &resources)
            .await?;
        let read_only = self.binder.determine_read_only(&request.identity, &project).await?;
        let values = self
            .binder
            .template_values(&commit, &namespace, &request.identity, &volumes);
        let deadline = project.job_deadline();

        let commit_id = commit.id.to_string();
        let payloads = resources
            .iter()
            .map(|resource| {
                let mut payload = render_placeholders(&resource.payload, &values);
                inject_job_labels(&mut payload, job_id.as_str(), Some(&commit_id));
                if read_only && let Some(claim) = &volumes.group_claim {
                    enforce_read_only(&mut payload, claim);
                }
                if let Some(seconds) = deadline {
                    apply_job_deadline(&mut payload, seconds);
                }
                to_resource_payload(resource, payload)
            })
            .collect::<Vec<_>>();

        // request, then what the manifests ask for, then the executor default
        let queue_name = request
            .queue_name
            .filter(|queue| !queue.trim().is_empty())
            .or_else(|| default_queue_for_resources(payloads.iter().map(|p| &p.payload)));

        info!(
            target: "flashplane::binder",
            job_id = %job_id,
            namespace = %namespace,
            resources = payloads.len(),
            read_only,
            deadline = ?deadline,
            "deploying config commit"
        );

        self.executor
            .submit(
                ctx,
                SubmitRequest {
                    job_id,
                    config_commit_id: Some(commit.id),
                    project_id: commit.project_id.clone(),
                    namespace,
                    user_id: request.identity.user_id.clone(),
                    username: request.identity.username.clone(),
                    resources: payloads,
                    submit_type: request.submit_type,
                    queue_name,
                    priority: request.priority,
                },
            )
            .await
    }

    /// Deletes every resource of a configuration version from the caller's
    /// namespace. Failures are logged per object and do not stop the rest.
    /// Returns how many objects were deleted (or already gone).
    pub async fn delete_instance(&self, commit_id: &ConfigCommitId, identity: &Identity) -> Result<usize> {
        let resources = self.resources.list_by_config(commit_id).await?;
        let commit = self.load_commit(commit_id).await?;

        let namespace = self.binder.namespace_for(&commit.project_id, identity);
        let values = self
            .binder
            .template_values(&commit, &namespace, identity, &BoundVolumes::default());

        let mut deleted = 0usize;
        for resource in &resources {
            let payload = render_placeholders(&resource.payload, &values);
            match self.binder.remove_object(&namespace, &payload).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(
                        target: "flashplane::binder",
                        namespace = %namespace,
                        resource = %resource.name,
                        error = %e,
                        "failed to delete resource"
                    );
                }
            }
        }

        info!(
            target: "flashplane::binder",
            commit_id = %commit.id,
            namespace = %namespace,
            deleted,
            total = resources.len(),
            "config instance deleted"
        );
        Ok(deleted)
    }

    async fn load_commit(&self, commit_id: &ConfigCommitId) -> Result<ConfigCommit> {
        self.commits
            .get(commit_id)
            .await?
            .ok_or(DomainError::ConfigCommitNotFound {
                commit_id: *commit_id,
            })
    }
}

/// Name and kind come from the rendered payload, falling back to the record
fn to_resource_payload(resource: &Resource, payload: Value) -> ResourcePayload {
    let kind = payload
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_else(|| resource.resource_type.as_str())
        .to_string();
    let name = payload
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or(&resource.name)
        .to_string();
    ResourcePayload {
        name,
        kind,
        payload,
    }
}

fn is_job_workload(kind: &str) -> bool {
    matches!(kind, "job" | "cronjob" | "flashjob")
}

fn is_workflow_workload(kind: &str) -> bool {
    matches!(kind, "workflow" | "workflowtemplate" | "cronworkflow")
}

/// Keeps the workloads matching `submit_type` plus every non-workload
/// resource. At least one workload has to survive.
pub fn filter_by_submit_type(resources: Vec<Resource>, submit_type: SubmitType) -> Result<Vec<Resource>> {
    let mut workloads = 0usize;
    let filtered: Vec<Resource> = resources
        .into_iter()
        .filter(|resource| {
            let kind = resource.kind().to_lowercase();
            let wanted = match submit_type {
                SubmitType::Job => is_job_workload(&kind),
                SubmitType::Workflow => is_workflow_workload(&kind),
            };
            if wanted {
                workloads += 1;
                return true;
            }
            !is_job_workload(&kind) && !is_workflow_workload(&kind)
        })
        .collect();

    if workloads == 0 {
        return Err(DomainError::NoWorkloadResources { submit_type });
    }
    Ok(filtered)
}
