//! Per-tenant storage: personal and group volumes and who may mount them.

use crate::shared_kernel::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Claim name token standing for the caller's personal volume
pub const USER_VOLUME_TOKEN: &str = "userVolume";
/// Claim name token standing for "any volume of the project's group"
pub const GROUP_VOLUME_TOKEN: &str = "groupVolume";

/// How a `persistentVolumeClaim.claimName` found in a manifest is resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimReference {
    Personal,
    ProjectGroup,
    NamedGroup(String),
}

impl ClaimReference {
    /// Classifies by textual convention; blank names reference nothing
    pub fn classify(claim_name: &str) -> Option<Self> {
        let trimmed = claim_name.trim();
        if trimmed.contains(USER_VOLUME_TOKEN) {
            Some(ClaimReference::Personal)
        } else if trimmed.contains(GROUP_VOLUME_TOKEN) {
            Some(ClaimReference::ProjectGroup)
        } else if trimmed.is_empty() {
            None
        } else {
            Some(ClaimReference::NamedGroup(trimmed.to_string()))
        }
    }
}

/// A same-named claim in a target namespace referencing an existing claim
/// elsewhere. Re-creating an existing binding is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBinding {
    pub source_namespace: String,
    pub source_claim: String,
    pub target_namespace: String,
    pub target_claim: String,
}

impl StorageBinding {
    /// Personal volume of `safe_username`, mounted under the same claim name
    pub fn personal(safe_username: &str, target_namespace: &str) -> Self {
        let claim = user_storage_claim(safe_username);
        Self {
            source_namespace: user_storage_namespace(safe_username),
            source_claim: claim.clone(),
            target_namespace: target_namespace.to_string(),
            target_claim: claim,
        }
    }

    pub fn group(group_id: &str, claim_name: &str, target_namespace: &str) -> Self {
        Self {
            source_namespace: group_storage_namespace(group_id),
            source_claim: claim_name.to_string(),
            target_namespace: target_namespace.to_string(),
            target_claim: claim_name.to_string(),
        }
    }
}

impl fmt::Display for StorageBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> {}/{}",
            self.source_namespace, self.source_claim, self.target_namespace, self.target_claim
        )
    }
}

pub fn user_storage_namespace(safe_username: &str) -> String {
    format!("user-{}-storage", safe_username)
}

pub fn user_storage_claim(safe_username: &str) -> String {
    format!("user-{}-disk", safe_username)
}

pub fn group_storage_namespace(group_id: &str) -> String {
    format!("group-{}-storage", group_id)
}

/// A volume owned by a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStorage {
    pub id: String,
    pub group_id: String,
    pub claim_name: String,
    pub capacity_gi: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePermission {
    None,
    Read,
    Write,
}

/// (group, user, volume) → capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPermission {
    pub group_id: String,
    pub user_id: String,
    pub storage_id: String,
    pub permission: StoragePermission,
    pub active: bool,
}

impl AccessPermission {
    pub fn can_read(&self) -> bool {
        self.active
            && matches!(
                self.permission,
                StoragePermission::Read | StoragePermission::Write
            )
    }

    pub fn can_write(&self) -> bool {
        self.active && self.permission == StoragePermission::Write
    }
}

#[async_trait]
pub trait GroupStorageRepository: Send + Sync {
    async fn list_by_group(&self, group_id: &str) -> Result<Vec<GroupStorage>>;
}

#[async_trait]
pub trait StoragePermissionRepository: Send + Sync {
    async fn get_permission(
        &self,
        group_id: &str,
        user_id: &str,
        storage_id: &str,
    ) -> Result<Option<AccessPermission>>;
}
