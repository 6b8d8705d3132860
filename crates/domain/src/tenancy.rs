use crate::shared_kernel::{DomainError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A project belongs to exactly one group, which owns its shared storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub group_id: String,
    /// Upper bound for a job's runtime. `None` or zero leaves jobs unbounded.
    #[serde(default)]
    pub max_job_runtime_seconds: Option<i64>,
    /// Weekly windows in which deployments are accepted. Empty means always.
    #[serde(default)]
    pub schedule_windows: Vec<ScheduleWindow>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group_id: group_id.into(),
            max_job_runtime_seconds: None,
            schedule_windows: Vec::new(),
        }
    }

    /// Deadline to apply on job workloads, if the project sets one
    pub fn job_deadline(&self) -> Option<i64> {
        self.max_job_runtime_seconds.filter(|seconds| *seconds > 0)
    }
}

/// One weekly window. `weekday` counts from Sunday (0) to Saturday (6);
/// `start` and `end` are `HH:MM` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub weekday: u32,
    pub start: String,
    pub end: String,
}

fn minutes_of_day(value: &str) -> Result<u32> {
    let time = NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        DomainError::InvalidScheduleWindow {
            value: value.to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(time.hour() * 60 + time.minute())
}

/// Checks `now` against the windows. A window whose end is before its
/// start runs past midnight into the next weekday; equal start and end
/// cover the whole weekday. Windows with an out-of-range weekday are ignored.
pub fn is_time_allowed(windows: &[ScheduleWindow], now: DateTime<Utc>) -> Result<bool> {
    if windows.is_empty() {
        return Ok(true);
    }

    let today = now.weekday().num_days_from_sunday();
    let minutes = now.hour() * 60 + now.minute();

    for window in windows {
        if window.weekday > 6 {
            continue;
        }
        let start = minutes_of_day(&window.start)?;
        let end = minutes_of_day(&window.end)?;

        let allowed = if start == end {
            window.weekday == today
        } else if end > start {
            window.weekday == today && (start..end).contains(&minutes)
        } else {
            let next_day = (window.weekday + 1) % 7;
            (window.weekday == today && minutes >= start) || (next_day == today && minutes < end)
        };
        if allowed {
            return Ok(true);
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub user_id: String,
    pub group_id: String,
    pub role: String,
}

impl GroupMembership {
    /// Only group managers and admins may write to group storage
    pub fn grants_write(&self) -> bool {
        matches!(self.role.as_str(), "manager" | "admin")
    }
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get(&self, project_id: &str) -> Result<Option<Project>>;
}

#[async_trait]
pub trait GroupMembershipRepository: Send + Sync {
    async fn get(&self, user_id: &str, group_id: &str) -> Result<Option<GroupMembership>>;
}
