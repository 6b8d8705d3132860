//! Fakes de los puertos de cluster para los tests de la capa de aplicación

use flashplane_domain::{
    ClusterClient, DomainError, RawWorkloadEvent, Result, StorageBinding, WorkloadClient,
    WorkloadEventStream, WorkloadObject, WorkloadSubmission,
};
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;

#[derive(Default)]
pub struct FakeClusterClient {
    namespaces: Mutex<Vec<String>>,
    bindings: Mutex<Vec<StorageBinding>>,
    applied: Mutex<Vec<(String, Value)>>,
    deleted_objects: Mutex<Vec<(String, String)>>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_sources: Mutex<HashSet<String>>,
    failing_objects: Mutex<HashSet<String>>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn namespaces(&self) -> Vec<String> {
        self.namespaces.lock().await.clone()
    }

    pub async fn bindings(&self) -> Vec<StorageBinding> {
        self.bindings.lock().await.clone()
    }

    pub async fn applied(&self) -> Vec<(String, Value)> {
        self.applied.lock().await.clone()
    }

    /// `(namespace, metadata.name)` of every deleted object
    pub async fn deleted_objects(&self) -> Vec<(String, String)> {
        self.deleted_objects.lock().await.clone()
    }

    pub async fn fail_delete_of(&self, name: &str) {
        self.failing_deletes.lock().await.insert(name.to_string());
    }

    /// Mounts whose source namespace matches will fail
    pub async fn fail_mounts_from(&self, source_namespace: &str) {
        self.failing_sources
            .lock()
            .await
            .insert(source_namespace.to_string());
    }

    /// Objects with this metadata.name will fail to apply
    pub async fn fail_apply_of(&self, name: &str) {
        self.failing_objects.lock().await.insert(name.to_string());
    }
}

#[async_trait::async_trait]
impl ClusterClient for FakeClusterClient {
    async fn ensure_namespace(&self, namespace: &str, _project_id: &str) -> Result<()> {
        self.namespaces.lock().await.push(namespace.to_string());
        Ok(())
    }

    async fn mount_existing_volume(&self, binding: &StorageBinding) -> Result<()> {
        if self
            .failing_sources
            .lock()
            .await
            .contains(&binding.source_namespace)
        {
            return Err(DomainError::ClusterError {
                message: format!("source claim {} is not bound", binding.source_claim),
            });
        }
        self.bindings.lock().await.push(binding.clone());
        Ok(())
    }

    async fn apply_object(&self, namespace: &str, object: &Value) -> Result<()> {
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if self.failing_objects.lock().await.contains(name) {
            return Err(DomainError::ClusterError {
                message: "admission webhook denied the request".to_string(),
            });
        }
        self.applied
            .lock()
            .await
            .push((namespace.to_string(), object.clone()));
        Ok(())
    }

    async fn delete_object(&self, namespace: &str, object: &Value) -> Result<()> {
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if self.failing_deletes.lock().await.contains(name) {
            return Err(DomainError::ClusterError {
                message: format!("failed to delete {}: forbidden", name),
            });
        }
        self.deleted_objects
            .lock()
            .await
            .push((namespace.to_string(), name.to_string()));
        Ok(())
    }
}

pub type EventSender = mpsc::Sender<Result<RawWorkloadEvent>>;

/// In-memory workload store whose watch sessions are scripted by the test
#[derive(Default)]
pub struct FakeWorkloadClient {
    objects: Mutex<BTreeMap<(String, String), WorkloadObject>>,
    submissions: Mutex<Vec<WorkloadSubmission>>,
    deleted: Mutex<Vec<(String, String)>>,
    fail_create: Mutex<Option<String>>,
    fail_list: Mutex<Option<String>>,
    watches: Mutex<VecDeque<Result<WorkloadEventStream>>>,
    watch_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeWorkloadClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, namespace: &str, name: &str, phase: Option<&str>) {
        let object = workload_object(namespace, name, phase);
        self.objects.lock().await.insert(
            (namespace.to_string(), name.to_string()),
            WorkloadObject::from_wire(object).unwrap(),
        );
    }

    pub async fn submissions(&self) -> Vec<WorkloadSubmission> {
        self.submissions.lock().await.clone()
    }

    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().await.clone()
    }

    pub async fn fail_create_with(&self, message: &str) {
        *self.fail_create.lock().await = Some(message.to_string());
    }

    /// Every later `list_all` fails with this message
    pub async fn fail_list_with(&self, message: &str) {
        *self.fail_list.lock().await = Some(message.to_string());
    }

    /// Queues a watch session fed through the returned sender
    pub async fn push_watch(&self) -> EventSender {
        let (tx, rx) = mpsc::channel(16);
        self.watches
            .lock()
            .await
            .push_back(Ok(ReceiverStream::new(rx).boxed()));
        tx
    }

    /// Queues a watch that cannot be established
    pub async fn push_watch_error(&self) {
        self.watches
            .lock()
            .await
            .push_back(Err(DomainError::ClusterError {
                message: "connection refused".to_string(),
            }));
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WorkloadClient for FakeWorkloadClient {
    async fn create(&self, submission: &WorkloadSubmission) -> Result<()> {
        if let Some(message) = self.fail_create.lock().await.clone() {
            return Err(DomainError::ClusterError { message });
        }
        self.submissions.lock().await.push(submission.clone());
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<WorkloadObject> {
        self.objects
            .lock()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| DomainError::WorkloadNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let key = (namespace.to_string(), name.to_string());
        if self.objects.lock().await.remove(&key).is_none() {
            return Err(DomainError::WorkloadNotFound {
                namespace: key.0,
                name: key.1,
            });
        }
        self.deleted.lock().await.push(key);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<WorkloadObject>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_list.lock().await.clone() {
            return Err(DomainError::ClusterError { message });
        }
        Ok(self.objects.lock().await.values().cloned().collect())
    }

    async fn watch_all(&self) -> Result<WorkloadEventStream> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        match self.watches.lock().await.pop_front() {
            Some(watch) => watch,
            None => Ok(futures::stream::pending().boxed()),
        }
    }
}

pub fn workload_object(namespace: &str, name: &str, phase: Option<&str>) -> Value {
    let mut object = json!({
        "apiVersion": flashplane_domain::WORKLOAD_API_VERSION,
        "kind": flashplane_domain::WORKLOAD_KIND,
        "metadata": {"name": name, "namespace": namespace},
        "spec": {"minAvailable": 1, "tasks": []}
    });
    if let Some(phase) = phase {
        object["status"] = json!({ "phase": phase });
    }
    object
}
