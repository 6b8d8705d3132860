pub use flashplane_shared::{
    ConfigCommitId, CorrelationId, JobId, JobStatus, ResourceId, SubmitType, WorkloadPhase,
};

/// Errores del dominio
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("no valid YAML documents found")]
    NoValidDocuments,

    #[error("failed to convert YAML to JSON for document {index}: {message}")]
    DocumentConversion { index: usize, message: String },

    #[error("validation failed in document {index}: {message}")]
    DocumentValidation { index: usize, message: String },

    #[error("failed to validate K8s spec for document {index}: {message}")]
    DocumentSpec { index: usize, message: String },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("container '{container}': {resource} limit ({limit}) cannot be less than request ({request})")]
    ContainerLimitViolation {
        container: String,
        resource: String,
        limit: String,
        request: String,
    },

    #[error("invalid submit request: {message}")]
    InvalidSubmitRequest { message: String },

    #[error("no pod templates found for flashjob")]
    NoPodTemplates,

    #[error("no {submit_type} workload resources found in configfile")]
    NoWorkloadResources { submit_type: SubmitType },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: JobId },

    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("Config commit not found: {commit_id}")]
    ConfigCommitNotFound { commit_id: ConfigCommitId },

    #[error("Group membership not found for user {user_id} in group {group_id}")]
    MembershipNotFound { user_id: String, group_id: String },

    #[error("no group storage available for group {group_id}")]
    GroupStorageUnavailable { group_id: String },

    #[error("group storage {volume} not found in group {group_id}")]
    GroupStorageNotFound { volume: String, group_id: String },

    #[error("user does not have access to group storage {volume}")]
    StorageAccessDenied { volume: String },

    #[error("project {project_id} is outside allowed schedule")]
    OutsideSchedule { project_id: String },

    #[error("failed to validate project schedule: invalid time '{value}': {message}")]
    InvalidScheduleWindow { value: String, message: String },

    #[error("failed to create resource {name}: {message}")]
    AuxiliaryResourceFailed { name: String, message: String },

    #[error("workload {namespace}/{name} not found")]
    WorkloadNotFound { namespace: String, name: String },

    #[error("watch channel closed")]
    WatchClosed,

    #[error("Cluster error: {message}")]
    ClusterError { message: String },

    #[error("Persistence error: {message}")]
    PersistenceError { message: String },

    #[error("Serialization error: {message}")]
    SerializationError { message: String },
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
