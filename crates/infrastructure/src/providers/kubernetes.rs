//! Kubernetes Cluster Client
//!
//! Namespaces, cross-namespace claim bindings and plain object creation
//! through kube-rs.

use async_trait::async_trait;
use flashplane_domain::{ClusterClient, DomainError, Result, StorageBinding};
use flashplane_shared::config::KubernetesConfig;
use k8s_openapi::api::core::v1::{
    Namespace, PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{
    Client, Config,
    api::{Api, DeleteParams, DynamicObject, GroupVersionKind, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    discovery::{self, Scope},
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const MANAGED_BY_LABEL: &str = "managed-by";
pub const MANAGED_BY_VALUE: &str = "platform";
const BIND_COMPLETED_ANNOTATION: &str = "pv.kubernetes.io/bind-completed";
const BOUND_BY_CONTROLLER_ANNOTATION: &str = "pv.kubernetes.io/bound-by-controller";

/// Builds a client from an explicit kubeconfig (and context) or, when no
/// path is configured, from the in-cluster / default environment.
pub async fn create_client(config: &KubernetesConfig) -> Result<Client> {
    let kube_config = match &config.kubeconfig_path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| DomainError::ClusterError {
                message: format!("Failed to read kubeconfig from {}: {}", path.display(), e),
            })?;
            let options = KubeConfigOptions {
                context: config.context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| DomainError::ClusterError {
                    message: format!("Failed to create Kubernetes config: {}", e),
                })?
        }
        None => Config::infer().await.map_err(|e| DomainError::ClusterError {
            message: format!("Failed to infer Kubernetes config: {}", e),
        })?,
    };

    Client::try_from(kube_config).map_err(|e| DomainError::ClusterError {
        message: format!("Failed to create Kubernetes client: {}", e),
    })
}

pub(crate) fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == code)
}

pub(crate) fn cluster_error(context: impl std::fmt::Display, err: kube::Error) -> DomainError {
    DomainError::ClusterError {
        message: format!("{}: {}", context, err),
    }
}

#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Bound volume name and storage request of an existing claim
    async fn source_volume(&self, binding: &StorageBinding) -> Result<(String, Option<Quantity>)> {
        let claims: Api<PersistentVolumeClaim> =
            Api::namespaced(self.client.clone(), &binding.source_namespace);
        let source = claims.get(&binding.source_claim).await.map_err(|e| {
            cluster_error(
                format!(
                    "failed to read claim {}/{}",
                    binding.source_namespace, binding.source_claim
                ),
                e,
            )
        })?;

        let spec = source.spec.unwrap_or_default();
        let volume_name = spec
            .volume_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DomainError::ClusterError {
                message: format!(
                    "claim {}/{} is not bound to a volume",
                    binding.source_namespace, binding.source_claim
                ),
            })?;
        let storage = spec
            .resources
            .and_then(|r| r.requests)
            .and_then(|mut requests| requests.remove("storage"));

        Ok((volume_name, storage))
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn ensure_namespace(&self, namespace: &str, project_id: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let object = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([
                    (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
                    ("type".to_string(), "project".to_string()),
                    ("project-id".to_string(), project_id.to_string()),
                ])),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };

        match namespaces.create(&PostParams::default(), &object).await {
            Ok(_) => {
                info!(target: "flashplane::k8s", namespace = %namespace, "namespace created");
                Ok(())
            }
            Err(e) if is_status(&e, 409) => {
                debug!(target: "flashplane::k8s", namespace = %namespace, "namespace already exists");
                Ok(())
            }
            Err(e) => Err(cluster_error(
                format!("failed to create namespace {}", namespace),
                e,
            )),
        }
    }

    async fn mount_existing_volume(&self, binding: &StorageBinding) -> Result<()> {
        let (volume_name, storage) = self.source_volume(binding).await?;

        let target = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(binding.target_claim.clone()),
                namespace: Some(binding.target_namespace.clone()),
                annotations: Some(BTreeMap::from([
                    (BIND_COMPLETED_ANNOTATION.to_string(), "yes".to_string()),
                    (BOUND_BY_CONTROLLER_ANNOTATION.to_string(), "yes".to_string()),
                ])),
                labels: Some(BTreeMap::from([(
                    MANAGED_BY_LABEL.to_string(),
                    MANAGED_BY_VALUE.to_string(),
                )])),
                ..ObjectMeta::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteMany".to_string()]),
                volume_name: Some(volume_name),
                resources: storage.map(|quantity| VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([("storage".to_string(), quantity)])),
                    ..VolumeResourceRequirements::default()
                }),
                ..PersistentVolumeClaimSpec::default()
            }),
            ..PersistentVolumeClaim::default()
        };

        let claims: Api<PersistentVolumeClaim> =
            Api::namespaced(self.client.clone(), &binding.target_namespace);
        match claims.create(&PostParams::default(), &target).await {
            Ok(_) => {
                info!(target: "flashplane::k8s", binding = %binding, "claim bound");
                Ok(())
            }
            Err(e) if is_status(&e, 409) => {
                debug!(target: "flashplane::k8s", binding = %binding, "claim already bound");
                Ok(())
            }
            Err(e) => Err(cluster_error(format!("failed to bind {}", binding), e)),
        }
    }

    async fn apply_object(&self, namespace: &str, object: &Value) -> Result<()> {
        let (api, dynamic, kind) = self.dynamic_api(namespace, object).await?;
        let name = dynamic.metadata.name.clone().unwrap_or_default();
        api.create(&PostParams::default(), &dynamic)
            .await
            .map_err(|e| cluster_error(format!("failed to create {} {}", kind, name), e))?;

        debug!(target: "flashplane::k8s", namespace = %namespace, kind = %kind, name = %name, "object created");
        Ok(())
    }

    async fn delete_object(&self, namespace: &str, object: &Value) -> Result<()> {
        let (api, dynamic, kind) = self.dynamic_api(namespace, object).await?;
        let name = dynamic
            .metadata
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DomainError::InvalidManifest {
                message: format!("{} is missing metadata.name", kind),
            })?;

        match api.delete(&name, &DeleteParams::background()).await {
            Ok(_) => {
                debug!(target: "flashplane::k8s", namespace = %namespace, kind = %kind, name = %name, "object deleted");
                Ok(())
            }
            Err(e) if is_status(&e, 404) => {
                debug!(target: "flashplane::k8s", namespace = %namespace, kind = %kind, name = %name, "object already gone");
                Ok(())
            }
            Err(e) => Err(cluster_error(format!("failed to delete {} {}", kind, name), e)),
        }
    }
}

impl KubeClusterClient {
    /// Resolves the API for an arbitrary object through discovery.
    /// Namespaced objects are pinned to `namespace`.
    async fn dynamic_api(
        &self,
        namespace: &str,
        object: &Value,
    ) -> Result<(Api<DynamicObject>, DynamicObject, String)> {
        let mut dynamic: DynamicObject = serde_json::from_value(object.clone())?;
        let types = dynamic.types.clone().ok_or_else(|| DomainError::InvalidManifest {
            message: "object is missing kind or apiVersion".to_string(),
        })?;
        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), types.api_version.clone()),
        };
        let gvk = GroupVersionKind::gvk(&group, &version, &types.kind);

        let (resource, capabilities) = discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|e| cluster_error(format!("unknown kind {}", types.kind), e))?;

        let api = match capabilities.scope {
            Scope::Namespaced => {
                dynamic.metadata.namespace = Some(namespace.to_string());
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
            Scope::Cluster => Api::all_with(self.client.clone(), &resource),
        };
        Ok((api, dynamic, types.kind))
    }
}
