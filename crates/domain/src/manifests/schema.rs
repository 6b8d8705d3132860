//! Typed partial views over manifest documents.
//!
//! Only the fields the platform reads are modelled. Everything else stays in
//! the raw JSON payload and is carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `apiVersion` + `kind` + `metadata`, present on every Kubernetes object
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHeader {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: Option<ObjectMetaView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetaView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpecView {
    #[serde(default)]
    pub containers: Vec<ContainerView>,
    #[serde(default)]
    pub init_containers: Vec<ContainerView>,
    #[serde(default)]
    pub volumes: Vec<VolumeView>,
}

impl PodSpecView {
    pub fn all_containers(&self) -> impl Iterator<Item = &ContainerView> {
        self.containers.iter().chain(self.init_containers.iter())
    }

    /// Claim names referenced by `persistentVolumeClaim` volumes
    pub fn claim_names(&self) -> impl Iterator<Item = &str> {
        self.volumes.iter().filter_map(|v| {
            v.persistent_volume_claim
                .as_ref()
                .map(|pvc| pvc.claim_name.as_str())
                .filter(|name| !name.is_empty())
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerView {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resources: Option<ResourceRequirementsView>,
}

/// Requests and limits keep the raw JSON value: quantities may be written
/// as strings (`"500m"`) or as bare numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRequirementsView {
    #[serde(default)]
    pub requests: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub limits: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeView {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub persistent_volume_claim: Option<ClaimSourceView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSourceView {
    #[serde(default)]
    pub claim_name: String,
}

/// Closed set of object shapes the platform knows how to look into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// A bare Pod; the pod spec is `spec`
    Pod,
    /// Controllers carrying a pod template at `spec.template`
    PodTemplated,
    /// `spec.jobTemplate.spec.template`
    CronJob,
    /// Anything else; carried as an opaque payload
    Opaque,
}

impl ManifestKind {
    pub fn classify(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "pod" => ManifestKind::Pod,
            "job" | "deployment" | "statefulset" | "daemonset" | "replicaset" => {
                ManifestKind::PodTemplated
            }
            "cronjob" => ManifestKind::CronJob,
            _ => ManifestKind::Opaque,
        }
    }

    /// JSON pointer to the pod template (`metadata` + `spec`), if any.
    /// For a Pod the object itself plays that role.
    pub fn pod_template_pointer(&self) -> Option<&'static str> {
        match self {
            ManifestKind::Pod => Some(""),
            ManifestKind::PodTemplated => Some("/spec/template"),
            ManifestKind::CronJob => Some("/spec/jobTemplate/spec/template"),
            ManifestKind::Opaque => None,
        }
    }

    /// JSON pointer to the pod spec, if any
    pub fn pod_spec_pointer(&self) -> Option<&'static str> {
        match self {
            ManifestKind::Pod => Some("/spec"),
            ManifestKind::PodTemplated => Some("/spec/template/spec"),
            ManifestKind::CronJob => Some("/spec/jobTemplate/spec/template/spec"),
            ManifestKind::Opaque => None,
        }
    }

    pub fn pod_spec<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        self.pod_spec_pointer()
            .and_then(|pointer| payload.pointer(pointer))
            .filter(|spec| spec.is_object())
    }

    pub fn pod_spec_mut<'a>(&self, payload: &'a mut Value) -> Option<&'a mut Value> {
        self.pod_spec_pointer()
            .and_then(|pointer| payload.pointer_mut(pointer))
            .filter(|spec| spec.is_object())
    }

    /// Typed view of the pod spec. A spec that does not fit the view is
    /// treated as absent.
    pub fn pod_spec_view(&self, payload: &Value) -> Option<PodSpecView> {
        self.pod_spec(payload)
            .and_then(|spec| PodSpecView::deserialize(spec).ok())
    }
}
