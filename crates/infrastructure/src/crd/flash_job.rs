//! FlashJob custom resource, as served by the batch scheduler.

use flashplane_domain::{PodTemplate, Result, WorkloadObject, WorkloadSubmission};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "scheduling.flash-sched.io",
    version = "v1alpha1",
    kind = "FlashJob",
    plural = "flashjobs",
    namespaced,
    status = "FlashJobStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct FlashJobSpec {
    pub min_available: i32,
    /// Pod template specs, kept untyped so manifests with numeric
    /// quantities still read back
    #[serde(default)]
    pub tasks: Vec<Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashJobStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FlashJobCondition>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashJobCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl FlashJob {
    pub fn from_submission(submission: &WorkloadSubmission) -> Result<Self> {
        let tasks = submission
            .tasks
            .iter()
            .map(task_template)
            .collect::<Result<Vec<_>>>()?;

        let mut job = FlashJob::new(
            &submission.name,
            FlashJobSpec {
                min_available: submission.min_available,
                tasks,
            },
        );
        job.metadata = ObjectMeta {
            name: Some(submission.name.clone()),
            namespace: Some(submission.namespace.clone()),
            labels: Some(submission.labels.clone()),
            ..ObjectMeta::default()
        };
        Ok(job)
    }

    pub fn into_workload(self) -> Result<WorkloadObject> {
        WorkloadObject::from_wire(serde_json::to_value(self)?)
    }
}

fn task_template(task: &PodTemplate) -> Result<Value> {
    let mut value = serde_json::to_value(task)?;
    if let Some(spec) = value.get_mut("spec") {
        for list in ["initContainers", "containers"] {
            let Some(containers) = spec.get_mut(list).and_then(Value::as_array_mut) else {
                continue;
            };
            for container in containers {
                stringify_quantities(container);
            }
        }
    }
    Ok(value)
}

/// `cpu: 1` becomes `cpu: "1"`, the form the Quantity type expects
fn stringify_quantities(container: &mut Value) {
    for section in ["requests", "limits"] {
        let Some(quantities) = container
            .pointer_mut(&format!("/resources/{section}"))
            .and_then(Value::as_object_mut)
        else {
            continue;
        };
        for quantity in quantities.values_mut() {
            if let Value::Number(n) = quantity {
                *quantity = Value::String(n.to_string());
            }
        }
    }
}
