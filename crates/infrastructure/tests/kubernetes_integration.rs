//! Kubernetes Integration Tests
//!
//! These tests require a Kubernetes cluster (kind, minikube, or real cluster)
//! with the FlashJob CRD installed.
//! Run with: FLASHPLANE_K8S_TEST=1 cargo test --test kubernetes_integration -- --ignored

use flashplane_domain::{
    ClusterClient, DomainError, PodTemplate, WatchEventType, WorkloadClient, WorkloadSubmission,
};
use flashplane_infrastructure::providers::{KubeClusterClient, KubeWorkloadClient, create_client};
use flashplane_shared::config::KubernetesConfig;
use futures::StreamExt;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

fn should_run_k8s_tests() -> bool {
    std::env::var("FLASHPLANE_K8S_TEST").unwrap_or_default() == "1"
}

fn test_namespace() -> String {
    std::env::var("FLASHPLANE_K8S_TEST_NAMESPACE").unwrap_or_else(|_| "proj-it-tester".to_string())
}

async fn clients() -> (KubeClusterClient, KubeWorkloadClient) {
    let config = KubernetesConfig::default();
    let client = create_client(&config)
        .await
        .expect("Failed to create kube client");
    (
        KubeClusterClient::new(client.clone()),
        KubeWorkloadClient::new(client, &config),
    )
}

fn sleeper_submission(namespace: &str, name: &str) -> WorkloadSubmission {
    let pod = json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "sleeper"},
        "spec": {
            "restartPolicy": "Never",
            "containers": [{"name": "main", "image": "busybox", "command": ["sleep", "30"]}]
        }
    });
    WorkloadSubmission {
        name: name.to_string(),
        namespace: namespace.to_string(),
        labels: BTreeMap::from([("flashplane.io/job-id".to_string(), name.to_string())]),
        min_available: 1,
        tasks: vec![PodTemplate::from_pod(&pod).expect("valid pod")],
    }
}

#[tokio::test]
#[ignore = "Requires Kubernetes cluster. Run with FLASHPLANE_K8S_TEST=1"]
async fn test_ensure_namespace_is_idempotent() {
    if !should_run_k8s_tests() {
        return;
    }

    let (cluster, _) = clients().await;
    let namespace = test_namespace();

    cluster
        .ensure_namespace(&namespace, "it")
        .await
        .expect("first ensure failed");
    cluster
        .ensure_namespace(&namespace, "it")
        .await
        .expect("second ensure must tolerate an existing namespace");
}

#[tokio::test]
#[ignore = "Requires Kubernetes cluster. Run with FLASHPLANE_K8S_TEST=1"]
async fn test_apply_and_delete_config_map() {
    if !should_run_k8s_tests() {
        return;
    }

    let (cluster, _) = clients().await;
    let namespace = test_namespace();
    cluster.ensure_namespace(&namespace, "it").await.unwrap();

    let name = format!("it-settings-{}", uuid::Uuid::new_v4().simple());
    let object = json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": name},
        "data": {"mode": "train"}
    });
    cluster
        .apply_object(&namespace, &object)
        .await
        .expect("Failed to apply ConfigMap");

    // create, not apply: a second submission of the same object fails
    assert!(cluster.apply_object(&namespace, &object).await.is_err());

    cluster
        .delete_object(&namespace, &object)
        .await
        .expect("Failed to delete ConfigMap");
    // already gone is not an error
    cluster.delete_object(&namespace, &object).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires Kubernetes cluster. Run with FLASHPLANE_K8S_TEST=1"]
async fn test_flashjob_create_get_watch_delete() {
    if !should_run_k8s_tests() {
        return;
    }

    let (cluster, workloads) = clients().await;
    let namespace = test_namespace();
    cluster.ensure_namespace(&namespace, "it").await.unwrap();

    let name = format!("fj-it-{}", uuid::Uuid::new_v4().simple());
    let mut events = workloads.watch_all().await.expect("Failed to open watch");

    workloads
        .create(&sleeper_submission(&namespace, &name))
        .await
        .expect("Failed to create FlashJob");

    let object = workloads.get(&namespace, &name).await.expect("Failed to get FlashJob");
    assert_eq!(object.name(), name);
    assert_eq!(object.namespace(), namespace);

    let listed = workloads.list_all().await.expect("Failed to list FlashJobs");
    assert!(listed.iter().any(|o| o.name() == name));

    workloads
        .delete(&namespace, &name)
        .await
        .expect("Failed to delete FlashJob");

    let saw_delete = tokio::time::timeout(Duration::from_secs(30), async {
        while let Some(event) = events.next().await {
            let Ok(event) = event else { continue };
            let named = event.object["metadata"]["name"].as_str() == Some(name.as_str());
            if named && event.event_type == WatchEventType::Deleted {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);
    assert!(saw_delete, "watch never reported the deletion");

    let err = workloads.delete(&namespace, &name).await.unwrap_err();
    assert!(matches!(err, DomainError::WorkloadNotFound { .. }));
}
