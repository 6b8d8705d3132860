//! Resolves where a configuration is deployed and what storage it may use.

use super::templates::TemplateValues;
use flashplane_domain::{
    ClaimReference, ClusterClient, ConfigCommit, DomainError, GroupMembershipRepository,
    GroupStorage, GroupStorageRepository, Identity, ManifestKind, Project, ProjectRepository,
    Resource, Result, StorageBinding, StoragePermissionRepository, project_namespace,
    to_safe_k8s_name,
};
use flashplane_shared::config::StorageNamingConfig;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Claim names resolved by [`DeploymentBinder::bind_volumes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundVolumes {
    pub user_claim: Option<String>,
    pub group_claim: Option<String>,
}

pub struct DeploymentBinder {
    cluster: Arc<dyn ClusterClient>,
    projects: Arc<dyn ProjectRepository>,
    group_storage: Arc<dyn GroupStorageRepository>,
    permissions: Arc<dyn StoragePermissionRepository>,
    memberships: Arc<dyn GroupMembershipRepository>,
    naming: StorageNamingConfig,
}

impl DeploymentBinder {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        projects: Arc<dyn ProjectRepository>,
        group_storage: Arc<dyn GroupStorageRepository>,
        permissions: Arc<dyn StoragePermissionRepository>,
        memberships: Arc<dyn GroupMembershipRepository>,
        naming: StorageNamingConfig,
    ) -> Self {
        Self {
            cluster,
            projects,
            group_storage,
            permissions,
            memberships,
            naming,
        }
    }

    /// Deterministic namespace for (project, caller), created if missing
    pub async fn prepare_namespace(
        &self,
        commit: &ConfigCommit,
        identity: &Identity,
    ) -> Result<(String, Project)> {
        let namespace = self.namespace_for(&commit.project_id, identity);

        self.cluster
            .ensure_namespace(&namespace, &commit.project_id)
            .await?;

        let project = self.projects.get(&commit.project_id).await?.ok_or_else(|| {
            DomainError::ProjectNotFound {
                project_id: commit.project_id.clone(),
            }
        })?;

        debug!(target: "flashplane::binder", namespace = %namespace, project_id = %project.id, "namespace ready");
        Ok((namespace, project))
    }

    pub fn namespace_for(&self, project_id: &str, identity: &Identity) -> String {
        let safe_username = to_safe_k8s_name(&identity.username);
        project_namespace(&self.naming.namespace_prefix, project_id, &safe_username)
    }

    /// Deletes one previously deployed object; already gone counts as done
    pub async fn remove_object(&self, namespace: &str, payload: &Value) -> Result<()> {
        self.cluster.delete_object(namespace, payload).await
    }

    /// Mounts every volume the resources reference into `namespace`.
    ///
    /// Fails on the first namespace, authorization or mount error. Bindings
    /// made earlier in the same call are left in place.
    pub async fn bind_volumes(
        &self,
        namespace: &str,
        project: &Project,
        identity: &Identity,
        resources: &[Resource],
    ) -> Result<BoundVolumes> {
        let references = collect_claim_references(resources);
        if references.is_empty() {
            return Ok(BoundVolumes::default());
        }

        let uses_personal = references.contains(&ClaimReference::Personal);
        let uses_project_group = references.contains(&ClaimReference::ProjectGroup);
        let mut named: BTreeSet<String> = references
            .into_iter()
            .filter_map(|r| match r {
                ClaimReference::NamedGroup(name) => Some(name),
                _ => None,
            })
            .collect();

        let storages = if uses_project_group || !named.is_empty() {
            self.group_storage.list_by_group(&project.group_id).await?
        } else {
            Vec::new()
        };

        let mut group_claim = None;
        if uses_project_group {
            let default = storages.first().ok_or_else(|| {
                DomainError::GroupStorageUnavailable {
                    group_id: project.group_id.clone(),
                }
            })?;
            group_claim = Some(default.claim_name.clone());
            named.insert(default.claim_name.clone());
        }

        let mut user_claim = None;
        if uses_personal {
            let binding =
                StorageBinding::personal(&to_safe_k8s_name(&identity.username), namespace);
            self.cluster.mount_existing_volume(&binding).await?;
            info!(target: "flashplane::binder", binding = %binding, "personal volume bound");
            user_claim = Some(binding.target_claim);
        }

        for claim_name in &named {
            let storage = storages
                .iter()
                .find(|s| &s.claim_name == claim_name)
                .ok_or_else(|| DomainError::GroupStorageNotFound {
                    volume: claim_name.clone(),
                    group_id: project.group_id.clone(),
                })?;

            if !identity.is_admin {
                self.authorize_group_storage(identity, storage).await?;
            }

            let binding = StorageBinding::group(&storage.group_id, claim_name, namespace);
            self.cluster.mount_existing_volume(&binding).await?;
            info!(target: "flashplane::binder", binding = %binding, "group volume bound");

            if group_claim.is_none() {
                group_claim = Some(claim_name.clone());
            }
        }

        Ok(BoundVolumes {
            user_claim,
            group_claim,
        })
    }

    /// A failed or missing permission lookup counts as no access
    async fn authorize_group_storage(
        &self,
        identity: &Identity,
        storage: &GroupStorage,
    ) -> Result<()> {
        let permission = self
            .permissions
            .get_permission(&storage.group_id, &identity.user_id, &storage.id)
            .await;

        match permission {
            Ok(Some(p)) if p.can_read() => Ok(()),
            Ok(_) => Err(DomainError::StorageAccessDenied {
                volume: storage.claim_name.clone(),
            }),
            Err(e) => {
                debug!(target: "flashplane::binder", error = %e, volume = %storage.claim_name, "permission lookup failed");
                Err(DomainError::StorageAccessDenied {
                    volume: storage.claim_name.clone(),
                })
            }
        }
    }

    /// Write access needs a platform admin or a group manager/admin role.
    /// Lookup errors are returned unchanged.
    pub async fn determine_read_only(&self, identity: &Identity, project: &Project) -> Result<bool> {
        if identity.is_admin {
            return Ok(false);
        }

        let membership = self
            .memberships
            .get(&identity.user_id, &project.group_id)
            .await?;

        Ok(!membership.is_some_and(|m| m.grants_write()))
    }

    pub fn template_values(
        &self,
        commit: &ConfigCommit,
        namespace: &str,
        identity: &Identity,
        volumes: &BoundVolumes,
    ) -> TemplateValues {
        let safe_username = to_safe_k8s_name(&identity.username);
        TemplateValues::from([
            ("username".to_string(), safe_username.clone()),
            ("originalUsername".to_string(), identity.username.clone()),
            ("safeUsername".to_string(), safe_username),
            ("namespace".to_string(), namespace.to_string()),
            ("projectId".to_string(), commit.project_id.clone()),
            (
                "userVolume".to_string(),
                volumes.user_claim.clone().unwrap_or_default(),
            ),
            (
                "groupVolume".to_string(),
                volumes.group_claim.clone().unwrap_or_default(),
            ),
        ])
    }
}

/// Claim references from every pod spec of every resource
pub fn collect_claim_references(resources: &[Resource]) -> BTreeSet<ClaimReference> {
    resources
        .iter()
        .filter_map(|r| ManifestKind::classify(r.kind()).pod_spec_view(&r.payload))
        .flat_map(|spec| {
            spec.claim_names()
                .filter_map(ClaimReference::classify)
                .collect::<Vec<_>>()
        })
        .collect()
}
