//! Scheduler Executor
//!
//! Turns a resource set into one scheduler-native workload and owns every
//! status write made on behalf of a caller. The reconciler is the only other
//! writer.

use flashplane_domain::{
    AuditAction, AuditEntry, AuditRepository, ClusterClient, ConfigCommitId, DomainError, Job,
    JobId, JobRepository, JobStatus, PodTemplate, RequestContext, Result,
    SubmitType, WorkloadClient, WorkloadSubmission, labels, normalize_kind,
};
use flashplane_shared::config::SchedulerConfig;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const AUDIT_RESOURCE_TYPE: &str = "job";

/// One rendered resource handed to [`SchedulerExecutor::submit`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePayload {
    pub name: String,
    pub kind: String,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub job_id: JobId,
    pub config_commit_id: Option<ConfigCommitId>,
    pub project_id: String,
    pub namespace: String,
    pub user_id: String,
    pub username: String,
    pub resources: Vec<ResourcePayload>,
    pub submit_type: SubmitType,
    /// Platform default queue when `None`
    pub queue_name: Option<String>,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

pub struct SchedulerExecutor {
    jobs: Arc<dyn JobRepository>,
    cluster: Arc<dyn ClusterClient>,
    workloads: Arc<dyn WorkloadClient>,
    audit: Arc<dyn AuditRepository>,
    config: SchedulerConfig,
}

impl SchedulerExecutor {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        cluster: Arc<dyn ClusterClient>,
        workloads: Arc<dyn WorkloadClient>,
        audit: Arc<dyn AuditRepository>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            cluster,
            workloads,
            audit,
            config,
        }
    }

    pub async fn submit(&self, ctx: &RequestContext, request: SubmitRequest) -> Result<SubmitResponse> {
        if request.job_id.is_empty() {
            return Err(DomainError::InvalidSubmitRequest {
                message: "job id is required".to_string(),
            });
        }
        if request.namespace.trim().is_empty() {
            return Err(DomainError::InvalidSubmitRequest {
                message: "namespace is required".to_string(),
            });
        }

        let queue_name = request
            .queue_name
            .clone()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| self.config.default_queue.clone());

        let mut job = Job::queued(
            request.job_id.clone(),
            &request.namespace,
            &request.project_id,
            &request.user_id,
        )
        .with_queue(&queue_name, request.priority)
        .with_submit_type(request.submit_type);
        if let Some(commit_id) = request.config_commit_id {
            job = job.with_config_commit(commit_id);
        }

        self.jobs.create(&job).await?;
        self.record(
            ctx,
            AuditAction::Create,
            &job.id,
            None,
            Some(serde_json::to_value(&job)?),
            "job queued",
        )
        .await;

        let (mut tasks, auxiliary) = match split_resources(&request.resources) {
            Ok(split) => split,
            Err(e) => return Err(self.fail(ctx, &job.id, e).await),
        };
        if tasks.is_empty() {
            return Err(self.fail(ctx, &job.id, DomainError::NoPodTemplates).await);
        }

        for task in &mut tasks {
            task.set_queue(&queue_name);
            if let Some(scheduler_name) = &self.config.scheduler_name {
                task.set_scheduler_name(scheduler_name);
            }
        }

        for resource in &auxiliary {
            if let Err(e) = self
                .cluster
                .apply_object(&request.namespace, &resource.payload)
                .await
            {
                let err = DomainError::AuxiliaryResourceFailed {
                    name: resource.name.clone(),
                    message: e.to_string(),
                };
                return Err(self.fail(ctx, &job.id, err).await);
            }
            debug!(target: "flashplane::executor", job_id = %job.id, name = %resource.name, kind = %resource.kind, "auxiliary resource applied");
        }

        let submission = WorkloadSubmission {
            name: job.id.to_string(),
            namespace: request.namespace.clone(),
            labels: workload_labels(&request),
            min_available: 1,
            tasks,
        };
        if let Err(e) = self.workloads.create(&submission).await {
            return Err(self.fail(ctx, &job.id, e).await);
        }

        info!(
            target: "flashplane::executor",
            job_id = %job.id,
            namespace = %request.namespace,
            queue = %queue_name,
            tasks = submission.tasks.len(),
            "flashjob submitted"
        );

        Ok(SubmitResponse {
            job_id: job.id,
            status: JobStatus::Queued,
        })
    }

    pub async fn cancel(&self, ctx: &RequestContext, job_id: &JobId) -> Result<()> {
        if job_id.is_empty() {
            return Err(DomainError::InvalidSubmitRequest {
                message: "job id is required".to_string(),
            });
        }

        let job = self.find(job_id).await?;
        self.workloads.delete(&job.namespace, job.id.as_str()).await?;
        self.jobs
            .update_status(job_id, JobStatus::Cancelled, None)
            .await?;
        self.record_transition(ctx, &job, JobStatus::Cancelled, "job cancelled")
            .await;

        info!(target: "flashplane::executor", job_id = %job_id, "job cancelled");
        Ok(())
    }

    /// Pulls the live phase from the cluster and writes it back
    pub async fn status(&self, ctx: &RequestContext, job_id: &JobId) -> Result<JobStatus> {
        let job = self.find(job_id).await?;
        let workload = self.workloads.get(&job.namespace, job.id.as_str()).await?;
        let status = workload.job_status();

        self.jobs.update_status(job_id, status, None).await?;
        if status != job.status {
            self.record_transition(ctx, &job, status, "job status refreshed")
                .await;
        }

        debug!(target: "flashplane::executor", job_id = %job_id, phase = ?workload.phase(), status = %status, "status refreshed");
        Ok(status)
    }

    pub async fn list_project_jobs(&self, project_id: &str) -> Result<Vec<Job>> {
        self.jobs.list_by_project(project_id).await
    }

    async fn find(&self, job_id: &JobId) -> Result<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| DomainError::JobNotFound {
                job_id: job_id.clone(),
            })
    }

    /// Marks the job failed with the error's message and hands the error
    /// back. A failed status write is logged; the original error wins.
    async fn fail(&self, ctx: &RequestContext, job_id: &JobId, err: DomainError) -> DomainError {
        let message = err.to_string();
        error!(target: "flashplane::executor", job_id = %job_id, error = %message, "submission failed");

        if let Err(e) = self
            .jobs
            .update_status(job_id, JobStatus::Failed, Some(&message))
            .await
        {
            warn!(target: "flashplane::executor", job_id = %job_id, error = %e, "could not mark job failed");
            return err;
        }

        self.record(
            ctx,
            AuditAction::Update,
            job_id,
            Some(json!({ "status": JobStatus::Queued })),
            Some(json!({ "status": JobStatus::Failed, "error_message": message })),
            "job failed",
        )
        .await;
        err
    }

    async fn record_transition(&self, ctx: &RequestContext, job: &Job, to: JobStatus, message: &str) {
        self.record(
            ctx,
            AuditAction::Update,
            &job.id,
            Some(json!({ "status": job.status })),
            Some(json!({ "status": to })),
            message,
        )
        .await;
    }

    async fn record(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        job_id: &JobId,
        old_value: Option<Value>,
        new_value: Option<Value>,
        message: &str,
    ) {
        let entry = AuditEntry::new(
            ctx,
            action,
            AUDIT_RESOURCE_TYPE,
            job_id.as_str(),
            old_value,
            new_value,
            message,
        );
        if let Err(e) = self.audit.save(&entry).await {
            warn!(target: "flashplane::executor", job_id = %job_id, error = %e, "failed to write audit entry");
        }
    }
}

/// Pods and Jobs become task templates; everything else is applied as is
fn split_resources(
    resources: &[ResourcePayload],
) -> Result<(Vec<PodTemplate>, Vec<&ResourcePayload>)> {
    let mut tasks = Vec::new();
    let mut auxiliary = Vec::new();

    for resource in resources {
        match normalize_kind(&resource.kind).as_str() {
            "Pod" => tasks.push(PodTemplate::from_pod(&resource.payload)?),
            "Job" => tasks.push(PodTemplate::from_job(&resource.payload)?),
            _ => auxiliary.push(resource),
        }
    }

    Ok((tasks, auxiliary))
}

fn workload_labels(request: &SubmitRequest) -> BTreeMap<String, String> {
    let mut out = BTreeMap::from([
        (labels::JOB_ID.to_string(), request.job_id.to_string()),
        (labels::PROJECT_ID.to_string(), request.project_id.clone()),
        (labels::USER_ID.to_string(), request.user_id.clone()),
        (labels::USERNAME.to_string(), request.username.clone()),
    ]);
    if let Some(commit_id) = request.config_commit_id {
        out.insert(labels::CONFIG_ID.to_string(), commit_id.to_string());
    }
    out
}
