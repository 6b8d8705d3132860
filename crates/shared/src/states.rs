use crate::error::SharedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Valida si una transición es un avance legal del state machine
    ///
    /// - Queued → Running, Failed, Cancelled
    /// - Running → Completed, Failed, Cancelled
    /// - Completed, Failed, Cancelled → (terminal)
    ///
    /// Queued → Failed covers submissions rejected by the cluster before the
    /// workload ever started.
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Queued, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Maps the phase reported by the batch scheduler to a job status.
    ///
    /// Total over its input: an absent, empty or unknown phase is `Queued`.
    pub fn from_phase(phase: Option<&str>) -> Self {
        match WorkloadPhase::from(phase.unwrap_or_default()) {
            WorkloadPhase::Running => JobStatus::Running,
            WorkloadPhase::Succeeded => JobStatus::Completed,
            WorkloadPhase::Failed => JobStatus::Failed,
            WorkloadPhase::Pending | WorkloadPhase::Unknown => JobStatus::Queued,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(SharedError::InvalidJobStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Phase reported by the external batch scheduler on its workload object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for WorkloadPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => WorkloadPhase::Pending,
            "Running" => WorkloadPhase::Running,
            "Succeeded" => WorkloadPhase::Succeeded,
            "Failed" => WorkloadPhase::Failed,
            _ => WorkloadPhase::Unknown,
        }
    }
}

/// How a configuration is submitted: as plain batch jobs or as a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitType {
    #[default]
    Job,
    Workflow,
}

impl SubmitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitType::Job => "job",
            SubmitType::Workflow => "workflow",
        }
    }
}

impl fmt::Display for SubmitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" => Ok(SubmitType::Job),
            "workflow" => Ok(SubmitType::Workflow),
            _ => Err(SharedError::InvalidSubmitType {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_mapping() {
        assert_eq!(JobStatus::from_phase(Some("Running")), JobStatus::Running);
        assert_eq!(
            JobStatus::from_phase(Some("Succeeded")),
            JobStatus::Completed
        );
        assert_eq!(JobStatus::from_phase(Some("Failed")), JobStatus::Failed);
        assert_eq!(JobStatus::from_phase(Some("Pending")), JobStatus::Queued);
        assert_eq!(JobStatus::from_phase(Some("")), JobStatus::Queued);
        assert_eq!(JobStatus::from_phase(None), JobStatus::Queued);
        assert_eq!(JobStatus::from_phase(Some("Aborted")), JobStatus::Queued);
        // Case sensitive, like the scheduler's own API
        assert_eq!(JobStatus::from_phase(Some("running")), JobStatus::Queued);
    }

    #[test]
    fn test_forward_transitions() {
        assert!(JobStatus::Queued.can_transition_to(&JobStatus::Running));
        assert!(JobStatus::Queued.can_transition_to(&JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(&JobStatus::Cancelled));
    }

    #[test]
    fn test_backward_and_terminal_transitions_are_rejected() {
        assert!(!JobStatus::Completed.can_transition_to(&JobStatus::Running));
        assert!(!JobStatus::Running.can_transition_to(&JobStatus::Queued));
        assert!(!JobStatus::Cancelled.can_transition_to(&JobStatus::Queued));
        assert!(!JobStatus::Queued.can_transition_to(&JobStatus::Queued));
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>(), Ok(status));
        }
        assert!("submitted".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&JobStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_submit_type_parsing() {
        assert_eq!("job".parse::<SubmitType>(), Ok(SubmitType::Job));
        assert_eq!("workflow".parse::<SubmitType>(), Ok(SubmitType::Workflow));
        assert!("batch".parse::<SubmitType>().is_err());
        assert_eq!(SubmitType::default(), SubmitType::Job);
    }
}
