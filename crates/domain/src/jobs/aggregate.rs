use crate::shared_kernel::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of one submission to the batch scheduler.
///
/// The job id is also the name of the scheduler-native workload object,
/// which is how lifecycle events are correlated back to this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub config_commit_id: Option<ConfigCommitId>,
    pub project_id: String,
    pub namespace: String,
    pub user_id: String,
    pub status: JobStatus,
    pub submit_type: SubmitType,
    pub queue_name: String,
    pub priority: i32,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    /// A freshly submitted job always starts out `queued`
    pub fn queued(
        id: JobId,
        namespace: impl Into<String>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            config_commit_id: None,
            project_id: project_id.into(),
            namespace: namespace.into(),
            user_id: user_id.into(),
            status: JobStatus::Queued,
            submit_type: SubmitType::Job,
            queue_name: String::new(),
            priority: 0,
            error_message: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_config_commit(mut self, config_commit_id: ConfigCommitId) -> Self {
        self.config_commit_id = Some(config_commit_id);
        self
    }

    pub fn with_queue(mut self, queue_name: impl Into<String>, priority: i32) -> Self {
        self.queue_name = queue_name.into();
        self.priority = priority;
        self
    }

    pub fn with_submit_type(mut self, submit_type: SubmitType) -> Self {
        self.submit_type = submit_type;
        self
    }
}

/// Persistence port for jobs. Every status write is a single-row update.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<()>;

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>>;

    /// Overwrites status and error message. Fails with `JobNotFound` when
    /// no row matches.
    async fn update_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Job>>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Job>>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>>;

    async fn list_by_project_and_statuses(
        &self,
        project_id: &str,
        statuses: &[JobStatus],
    ) -> Result<Vec<Job>>;

    async fn count_by_user_project_and_statuses(
        &self,
        user_id: &str,
        project_id: &str,
        statuses: &[JobStatus],
    ) -> Result<u64>;
}
