use super::db_error;
use flashplane_domain::{
    ConfigCommitId, DomainError, Job, JobId, JobRepository, JobStatus, Result, SubmitType,
};
use sqlx::{PgPool, Row, postgres::PgRow};

const JOB_COLUMNS: &str = "id, config_commit_id, project_id, namespace, user_id, status, \
     submit_type, queue_name, priority, error_message, submitted_at";

/// Repositorio persistente para Jobs basado en PostgreSQL
#[derive(Clone)]
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, bind: &str) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE {} ORDER BY submitted_at DESC",
            JOB_COLUMNS, clause
        );
        let rows = sqlx::query(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list jobs", e))?;
        rows.iter().map(map_row_to_job).collect()
    }
}

fn status_strings(statuses: &[JobStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn map_row_to_job(row: &PgRow) -> Result<Job> {
    let get_err = |e: sqlx::Error| db_error("Failed to read job row", e);

    let status: String = row.try_get("status").map_err(get_err)?;
    let submit_type: String = row.try_get("submit_type").map_err(get_err)?;
    let config_commit_id: Option<uuid::Uuid> = row.try_get("config_commit_id").map_err(get_err)?;

    Ok(Job {
        id: JobId(row.try_get("id").map_err(get_err)?),
        config_commit_id: config_commit_id.map(ConfigCommitId::from_uuid),
        project_id: row.try_get("project_id").map_err(get_err)?,
        namespace: row.try_get("namespace").map_err(get_err)?,
        user_id: row.try_get("user_id").map_err(get_err)?,
        status: status
            .parse::<JobStatus>()
            .map_err(|e| DomainError::PersistenceError {
                message: e.to_string(),
            })?,
        submit_type: submit_type
            .parse::<SubmitType>()
            .map_err(|e| DomainError::PersistenceError {
                message: e.to_string(),
            })?,
        queue_name: row.try_get("queue_name").map_err(get_err)?,
        priority: row.try_get("priority").map_err(get_err)?,
        error_message: row.try_get("error_message").map_err(get_err)?,
        submitted_at: row.try_get("submitted_at").map_err(get_err)?,
    })
}

#[async_trait::async_trait]
impl JobRepository for PostgresJobRepository {
    async fn create(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, config_commit_id, project_id, namespace, user_id, status,
                 submit_type, queue_name, priority, error_message, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.config_commit_id.map(|id| *id.as_uuid()))
        .bind(&job.project_id)
        .bind(&job.namespace)
        .bind(&job.user_id)
        .bind(job.status.as_str())
        .bind(job.submit_type.as_str())
        .bind(&job.queue_name)
        .bind(job.priority)
        .bind(&job.error_message)
        .bind(job.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create job", e))?;
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(job_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find job by id", e))?;

        row.as_ref().map(map_row_to_job).transpose()
    }

    async fn update_status(
        &self,
        job_id: &JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET status = $1, error_message = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(error_message)
            .bind(job_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update job status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::JobNotFound {
                job_id: job_id.clone(),
            });
        }
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Job>> {
        self.fetch_where("project_id = $1", project_id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Job>> {
        self.fetch_where("user_id = $1", user_id).await
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        self.fetch_where("status = $1", status.as_str()).await
    }

    async fn list_by_project_and_statuses(
        &self,
        project_id: &str,
        statuses: &[JobStatus],
    ) -> Result<Vec<Job>> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE project_id = $1 AND status = ANY($2) ORDER BY submitted_at DESC",
            JOB_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .bind(status_strings(statuses))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list jobs by project and status", e))?;
        rows.iter().map(map_row_to_job).collect()
    }

    async fn count_by_user_project_and_statuses(
        &self,
        user_id: &str,
        project_id: &str,
        statuses: &[JobStatus],
    ) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE user_id = $1 AND project_id = $2 AND status = ANY($3)",
        )
        .bind(user_id)
        .bind(project_id)
        .bind(status_strings(statuses))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count jobs", e))?;
        Ok(count.max(0) as u64)
    }
}
