//! Reconciliation Loop
//!
//! Keeps job records in line with the phases the scheduler reports for its
//! workload objects. Every (re)connect starts with a full resync, then the
//! loop follows a watch until it breaks, backs off and starts over.
//! Transient errors are logged and retried; only cancellation ends the loop.

use super::backoff::ReconcileBackoff;
use flashplane_domain::{
    DomainError, JobId, JobRepository, JobStatus, RawWorkloadEvent, Result, WatchEventType,
    WorkloadClient, WorkloadObject,
};
use flashplane_shared::config::ReconcilerConfig;
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ReconciliationLoop {
    workloads: Arc<dyn WorkloadClient>,
    jobs: Arc<dyn JobRepository>,
    config: ReconcilerConfig,
}

impl ReconciliationLoop {
    pub fn new(
        workloads: Arc<dyn WorkloadClient>,
        jobs: Arc<dyn JobRepository>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            workloads,
            jobs,
            config,
        }
    }

    /// Runs until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut backoff = ReconcileBackoff::from(&self.config);
        info!(target: "flashplane::reconciler", "flashjob reconciler started");

        while !shutdown.is_cancelled() {
            let Err(e) = self.session(&shutdown, &mut backoff).await else {
                break;
            };

            let delay = backoff.next_delay();
            warn!(
                target: "flashplane::reconciler",
                error = %e,
                retry_in_secs = delay.as_secs(),
                "flashjob watch failed, retrying"
            );
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(target: "flashplane::reconciler", "flashjob reconciler stopped");
    }

    /// One resync followed by one watch. Returns `Ok` only on shutdown.
    async fn session(
        &self,
        shutdown: &CancellationToken,
        backoff: &mut ReconcileBackoff,
    ) -> Result<()> {
        // a failed list must not keep the watch from opening
        if let Err(e) = self.resync().await {
            warn!(target: "flashplane::reconciler", error = %e, "flashjob resync failed, continuing with watch");
        }

        let mut events = self.workloads.watch_all().await?;
        backoff.reset();
        debug!(target: "flashplane::reconciler", "flashjob watch established");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = events.next() => match next {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => return Err(e),
                    None => return Err(DomainError::WatchClosed),
                },
            }
        }
    }

    /// Writes the mapped phase of every workload object in the cluster.
    /// Returns how many objects were listed.
    pub async fn resync(&self) -> Result<usize> {
        let objects = self.workloads.list_all().await?;
        for object in &objects {
            self.write_status(object.name(), object.job_status()).await;
        }
        info!(target: "flashplane::reconciler", count = objects.len(), "flashjob resync completed");
        Ok(objects.len())
    }

    async fn handle_event(&self, event: RawWorkloadEvent) {
        if event.event_type == WatchEventType::Bookmark {
            return;
        }

        let object = match WorkloadObject::from_wire(event.object) {
            Ok(object) => object,
            Err(e) => {
                warn!(target: "flashplane::reconciler", error = %e, "skipping unreadable flashjob event");
                return;
            }
        };

        // deletion wins over whatever phase was last reported
        let status = match event.event_type {
            WatchEventType::Deleted => JobStatus::Cancelled,
            _ => object.job_status(),
        };
        self.write_status(object.name(), status).await;
    }

    async fn write_status(&self, name: &str, status: JobStatus) {
        let job_id = JobId::from(name);

        let job = match self.jobs.get(&job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!(target: "flashplane::reconciler", job_id = %job_id, "no job for flashjob, skipping");
                return;
            }
            Err(e) => {
                warn!(target: "flashplane::reconciler", job_id = %job_id, error = %e, "failed to load job");
                return;
            }
        };

        if job.status != status && !job.status.can_transition_to(&status) {
            debug!(target: "flashplane::reconciler", job_id = %job_id, from = %job.status, to = %status, "applying out-of-order status");
        }

        match self.jobs.update_status(&job_id, status, None).await {
            Ok(()) => {
                debug!(target: "flashplane::reconciler", job_id = %job_id, status = %status, "job status synced");
            }
            Err(DomainError::JobNotFound { .. }) => {
                debug!(target: "flashplane::reconciler", job_id = %job_id, "job removed before status write, skipping");
            }
            Err(e) => {
                warn!(target: "flashplane::reconciler", job_id = %job_id, error = %e, "failed to sync job status");
            }
        }
    }
}
