//! Manifest → resource plan, and plan vs. stored resources → change set.

use flashplane_domain::{
    ConfigCommitId, DomainError, Resource, ResourceChangeSet, ResourceType, Result,
    parse_manifest,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// One validated document, ready to be stored as a resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePlanItem {
    pub resource_type: ResourceType,
    pub name: String,
    pub payload: Value,
}

/// An update keeps the stored identity and replaces type and payload
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceUpdate {
    pub before: Resource,
    pub after: Resource,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub creates: Vec<Resource>,
    pub updates: Vec<ResourceUpdate>,
    pub deletes: Vec<Resource>,
}

impl SyncPlan {
    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} deleted",
            self.creates.len(),
            self.updates.len(),
            self.deletes.len()
        )
    }

    pub fn to_change_set(&self) -> ResourceChangeSet {
        ResourceChangeSet {
            creates: self.creates.clone(),
            updates: self.updates.iter().map(|u| u.after.clone()).collect(),
            deletes: self.deletes.clone(),
        }
    }
}

/// Parses and validates every document. Any failure rejects the whole
/// manifest, naming the 1-based document index.
pub fn plan(raw: &str) -> Result<Vec<ResourcePlanItem>> {
    let documents = parse_manifest(raw)?;

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(documents.len());
    for doc in documents {
        if !seen.insert(doc.name.clone()) {
            return Err(DomainError::DocumentValidation {
                index: doc.index,
                message: format!("duplicate resource name '{}'", doc.name),
            });
        }
        items.push(ResourcePlanItem {
            resource_type: ResourceType::from(doc.normalized_kind),
            name: doc.name,
            payload: doc.payload,
        });
    }

    tracing::debug!(target: "flashplane::diff", documents = items.len(), "manifest planned");
    Ok(items)
}

/// Diffs by name: both sides → update, new only → create, old only → delete.
/// Creates and updates follow manifest order, deletes follow stored order.
pub fn sync(
    config_commit_id: ConfigCommitId,
    existing: &[Resource],
    planned: Vec<ResourcePlanItem>,
) -> SyncPlan {
    let mut existing_by_name: HashMap<&str, &Resource> =
        existing.iter().map(|r| (r.name.as_str(), r)).collect();

    let mut result = SyncPlan::default();
    for item in planned {
        match existing_by_name.remove(item.name.as_str()) {
            Some(before) => {
                let mut after = before.clone();
                after.resource_type = item.resource_type;
                after.payload = item.payload;
                result.updates.push(ResourceUpdate {
                    before: before.clone(),
                    after,
                });
            }
            None => result.creates.push(Resource::new(
                config_commit_id,
                item.resource_type,
                item.name,
                item.payload,
            )),
        }
    }

    result.deletes = existing
        .iter()
        .filter(|r| existing_by_name.contains_key(r.name.as_str()))
        .cloned()
        .collect();

    result
}
