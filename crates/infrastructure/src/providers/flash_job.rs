//! FlashJob Workload Client
//!
//! Create, read, delete, list and watch of the scheduler's FlashJob objects.
//! Every request except the watch is bounded by the configured timeout.

use super::kubernetes::{cluster_error, is_status};
use crate::crd::FlashJob;
use async_trait::async_trait;
use flashplane_domain::{
    DomainError, RawWorkloadEvent, Result, WatchEventType, WorkloadClient, WorkloadEventStream,
    WorkloadObject, WorkloadSubmission,
};
use flashplane_shared::config::KubernetesConfig;
use futures::{Future, StreamExt};
use kube::{
    Client,
    api::{Api, ApiResource, DeleteParams, DynamicObject, ListParams, PostParams, WatchEvent, WatchParams},
};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct KubeWorkloadClient {
    client: Client,
    request_timeout: Duration,
}

impl KubeWorkloadClient {
    pub fn new(client: Client, config: &KubernetesConfig) -> Self {
        Self {
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn namespaced(&self, namespace: &str) -> Api<FlashJob> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn timed<T>(
        &self,
        operation: &str,
        request: impl Future<Output = std::result::Result<T, kube::Error>>,
    ) -> Result<std::result::Result<T, kube::Error>> {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| DomainError::ClusterError {
                message: format!(
                    "{} timed out after {}s",
                    operation,
                    self.request_timeout.as_secs()
                ),
            })
    }
}

fn not_found(namespace: &str, name: &str) -> DomainError {
    DomainError::WorkloadNotFound {
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

fn to_raw_event(event: WatchEvent<DynamicObject>) -> Result<RawWorkloadEvent> {
    let (event_type, object) = match event {
        WatchEvent::Added(object) => (WatchEventType::Added, object),
        WatchEvent::Modified(object) => (WatchEventType::Modified, object),
        WatchEvent::Deleted(object) => (WatchEventType::Deleted, object),
        WatchEvent::Bookmark(_) => {
            return Ok(RawWorkloadEvent {
                event_type: WatchEventType::Bookmark,
                object: serde_json::Value::Null,
            });
        }
        WatchEvent::Error(status) => {
            return Err(DomainError::ClusterError {
                message: format!("watch error {}: {}", status.code, status.message),
            });
        }
    };

    Ok(RawWorkloadEvent {
        event_type,
        object: serde_json::to_value(object)?,
    })
}

#[async_trait]
impl WorkloadClient for KubeWorkloadClient {
    async fn create(&self, submission: &WorkloadSubmission) -> Result<()> {
        let object = FlashJob::from_submission(submission)?;
        let api = self.namespaced(&submission.namespace);

        self.timed("flashjob create", api.create(&PostParams::default(), &object))
            .await?
            .map_err(|e| cluster_error(format!("failed to create flashjob {}", submission.name), e))?;

        info!(target: "flashplane::k8s", namespace = %submission.namespace, name = %submission.name, "flashjob created");
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<WorkloadObject> {
        let api = self.namespaced(namespace);
        match self.timed("flashjob get", api.get(name)).await? {
            Ok(object) => object.into_workload(),
            Err(e) if is_status(&e, 404) => Err(not_found(namespace, name)),
            Err(e) => Err(cluster_error(format!("failed to get flashjob {}", name), e)),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let api = self.namespaced(namespace);
        match self
            .timed("flashjob delete", api.delete(name, &DeleteParams::background()))
            .await?
        {
            Ok(_) => {
                info!(target: "flashplane::k8s", namespace = %namespace, name = %name, "flashjob deleted");
                Ok(())
            }
            Err(e) if is_status(&e, 404) => Err(not_found(namespace, name)),
            Err(e) => Err(cluster_error(format!("failed to delete flashjob {}", name), e)),
        }
    }

    async fn list_all(&self) -> Result<Vec<WorkloadObject>> {
        let api: Api<FlashJob> = Api::all(self.client.clone());
        let list = self
            .timed("flashjob list", api.list(&ListParams::default()))
            .await?
            .map_err(|e| cluster_error("failed to list flashjobs", e))?;

        list.items
            .into_iter()
            .map(FlashJob::into_workload)
            .collect()
    }

    async fn watch_all(&self) -> Result<WorkloadEventStream> {
        // untyped on purpose: decoding happens per event so one bad object
        // does not break the whole watch
        let resource = ApiResource::erase::<FlashJob>(&());
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);

        let events = api
            .watch(&WatchParams::default(), "0")
            .await
            .map_err(|e| cluster_error("failed to watch flashjobs", e))?;
        debug!(target: "flashplane::k8s", "flashjob watch opened");

        Ok(events
            .map(|event| match event {
                Ok(event) => to_raw_event(event),
                Err(e) => Err(cluster_error("flashjob watch failed", e)),
            })
            .boxed())
    }
}
