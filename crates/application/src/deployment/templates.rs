//! Rendering of stored resources before they are submitted:
//! `{{key}}` placeholders, correlation labels, read-only group mounts,
//! runtime deadlines and the queue a resource set asks for.

use flashplane_domain::{ManifestKind, QUEUE_NAME_ANNOTATION, labels};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Placeholder values available to manifests
pub type TemplateValues = BTreeMap<String, String>;

/// Replaces `{{key}}` and `{{ key }}` in every string and object key.
/// Unknown placeholders are left as written.
pub fn render_placeholders(payload: &Value, values: &TemplateValues) -> Value {
    match payload {
        Value::String(s) => Value::String(replace_in_str(s, values)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_placeholders(item, values))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (replace_in_str(k, values), render_placeholders(v, values)))
                .collect::<Map<_, _>>(),
        ),
        other => other.clone(),
    }
}

fn replace_in_str(input: &str, values: &TemplateValues) -> String {
    if !input.contains("{{") {
        return input.to_string();
    }
    values.iter().fold(input.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{}}}}}", key), value)
            .replace(&format!("{{{{ {} }}}}", key), value)
    })
}

/// Labels the object and its pod template with the job id and, when
/// known, the configuration version.
pub fn inject_job_labels(payload: &mut Value, job_id: &str, commit_id: Option<&str>) {
    if job_id.is_empty() {
        return;
    }

    // pod templates get metadata created when the manifest leaves it out
    for parent in ["", "/spec/template", "/spec/jobTemplate/spec/template"] {
        let Some(Value::Object(object)) = payload.pointer_mut(parent) else {
            continue;
        };
        let Some(object_labels) =
            ensure_object(object, "metadata").and_then(|meta| ensure_object(meta, "labels"))
        else {
            continue;
        };
        object_labels.insert(labels::JOB_ID.to_string(), Value::String(job_id.to_string()));
        if let Some(commit_id) = commit_id {
            object_labels.insert(
                labels::CONFIG_COMMIT_ID.to_string(),
                Value::String(commit_id.to_string()),
            );
        }
    }
}

fn ensure_object<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Map<String, Value>> {
    let entry = parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}

/// Caps the runtime of job workloads at `seconds`. Jobs get it on the job
/// spec and on their pod template, since only the template reaches the
/// scheduler; CronJobs on the spawned job spec; bare Pods on the pod spec.
pub fn apply_job_deadline(payload: &mut Value, seconds: i64) {
    let kind = payload
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let pointers: &[&str] = match kind.as_str() {
        "job" => &["/spec", "/spec/template/spec"],
        "cronjob" => &["/spec/jobTemplate/spec"],
        "pod" => &["/spec"],
        _ => &[],
    };
    for pointer in pointers {
        if let Some(Value::Object(spec)) = payload.pointer_mut(pointer) {
            spec.insert("activeDeadlineSeconds".to_string(), Value::from(seconds));
        }
    }
}

/// First queue named through the scheduler annotation, on a resource or
/// on its pod template
pub fn default_queue_for_resources<'a>(payloads: impl IntoIterator<Item = &'a Value>) -> Option<String> {
    payloads.into_iter().find_map(|payload| {
        let kind = payload
            .get("kind")
            .and_then(Value::as_str)
            .map(ManifestKind::classify)
            .unwrap_or(ManifestKind::Opaque);
        let template = kind
            .pod_template_pointer()
            .filter(|pointer| !pointer.is_empty())
            .and_then(|pointer| payload.pointer(pointer));
        [Some(payload), template]
            .into_iter()
            .flatten()
            .filter_map(|object| object.pointer("/metadata/annotations"))
            .filter_map(|annotations| annotations.get(QUEUE_NAME_ANNOTATION))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|queue| !queue.is_empty())
            .map(str::to_string)
    })
}

/// Marks every mount of a volume backed by `claim_name` as `readOnly`
pub fn enforce_read_only(payload: &mut Value, claim_name: &str) {
    let kind = payload
        .get("kind")
        .and_then(Value::as_str)
        .map(ManifestKind::classify)
        .unwrap_or(ManifestKind::Opaque);
    let Some(spec) = kind.pod_spec_mut(payload) else {
        return;
    };

    let restricted: HashSet<String> = spec
        .get("volumes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|vol| {
            vol.pointer("/persistentVolumeClaim/claimName")
                .and_then(Value::as_str)
                == Some(claim_name)
        })
        .filter_map(|vol| vol.get("name").and_then(Value::as_str).map(str::to_string))
        .collect();
    if restricted.is_empty() {
        return;
    }

    for containers_key in ["containers", "initContainers"] {
        let Some(containers) = spec.get_mut(containers_key).and_then(Value::as_array_mut) else {
            continue;
        };
        for container in containers {
            let Some(mounts) = container
                .get_mut("volumeMounts")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for mount in mounts {
                let targets_restricted = mount
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| restricted.contains(name));
                if !targets_restricted {
                    continue;
                }
                if let Some(mount) = mount.as_object_mut() {
                    mount.insert("readOnly".to_string(), Value::Bool(true));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> TemplateValues {
        BTreeMap::from([
            ("username".to_string(), "alice".to_string()),
            ("groupVolume".to_string(), "datasets".to_string()),
        ])
    }

    #[test]
    fn test_placeholders_in_values_and_keys() {
        let payload = json!({
            "metadata": {"name": "job-{{username}}", "labels": {"{{username}}": "owner"}},
            "spec": {"volumes": [{"persistentVolumeClaim": {"claimName": "{{ groupVolume }}"}}]},
            "replicas": 2
        });
        let rendered = render_placeholders(&payload, &values());

        assert_eq!(rendered["metadata"]["name"], "job-alice");
        assert_eq!(rendered["metadata"]["labels"]["alice"], "owner");
        assert_eq!(
            rendered["spec"]["volumes"][0]["persistentVolumeClaim"]["claimName"],
            "datasets"
        );
        assert_eq!(rendered["replicas"], 2);
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let rendered = render_placeholders(&json!("{{missing}}"), &values());
        assert_eq!(rendered, json!("{{missing}}"));
    }

    #[test]
    fn test_job_labels_reach_pod_templates() {
        let mut job = json!({
            "kind": "CronJob",
            "metadata": {"name": "nightly"},
            "spec": {"jobTemplate": {"spec": {"template": {"metadata": {}, "spec": {}}}}}
        });
        inject_job_labels(&mut job, "job-1", Some("commit-9"));

        assert_eq!(job["metadata"]["labels"][labels::JOB_ID], "job-1");
        let template_labels = &job["spec"]["jobTemplate"]["spec"]["template"]["metadata"]["labels"];
        assert_eq!(template_labels[labels::JOB_ID], "job-1");
        assert_eq!(template_labels[labels::CONFIG_COMMIT_ID], "commit-9");
    }

    #[test]
    fn test_job_labels_create_missing_template_metadata() {
        let mut job = json!({
            "kind": "Job",
            "metadata": {"name": "trainer"},
            "spec": {"template": {"spec": {"containers": []}}}
        });
        inject_job_labels(&mut job, "job-1", None);

        let template = &job["spec"]["template"];
        assert_eq!(template["metadata"]["labels"][labels::JOB_ID], "job-1");
        assert!(template["metadata"]["labels"].get(labels::CONFIG_COMMIT_ID).is_none());
        assert_eq!(template["spec"]["containers"], json!([]));
    }

    #[test]
    fn test_job_labels_without_any_metadata() {
        let mut pod = json!({"kind": "Pod", "spec": {}});
        inject_job_labels(&mut pod, "job-2", Some("commit-1"));

        assert_eq!(pod["metadata"]["labels"][labels::JOB_ID], "job-2");
        assert_eq!(pod["metadata"]["labels"][labels::CONFIG_COMMIT_ID], "commit-1");
        assert!(pod.pointer("/spec/template").is_none());
    }

    #[test]
    fn test_deadline_on_job_and_its_template() {
        let mut job = json!({
            "kind": "Job",
            "spec": {"backoffLimit": 0, "template": {"spec": {"containers": []}}}
        });
        apply_job_deadline(&mut job, 3600);

        assert_eq!(job["spec"]["activeDeadlineSeconds"], 3600);
        assert_eq!(job["spec"]["template"]["spec"]["activeDeadlineSeconds"], 3600);
        assert_eq!(job["spec"]["backoffLimit"], 0);
    }

    #[test]
    fn test_deadline_on_cronjob_job_template() {
        let mut cron = json!({
            "kind": "CronJob",
            "spec": {"schedule": "0 * * * *", "jobTemplate": {"spec": {"template": {}}}}
        });
        apply_job_deadline(&mut cron, 60);

        assert_eq!(cron["spec"]["jobTemplate"]["spec"]["activeDeadlineSeconds"], 60);
        assert!(cron["spec"].get("activeDeadlineSeconds").is_none());
    }

    #[test]
    fn test_deadline_leaves_other_kinds_alone() {
        let before = json!({"kind": "Deployment", "spec": {"template": {"spec": {}}}});
        let mut deployment = before.clone();
        apply_job_deadline(&mut deployment, 60);
        assert_eq!(deployment, before);

        let mut map = json!({"kind": "ConfigMap", "data": {}});
        apply_job_deadline(&mut map, 60);
        assert!(map.get("spec").is_none());
    }

    #[test]
    fn test_queue_from_resource_or_template_annotation() {
        let config_map = json!({"kind": "ConfigMap", "metadata": {"name": "settings"}});
        let job = json!({
            "kind": "Job",
            "metadata": {"name": "train"},
            "spec": {"template": {"metadata": {"annotations": {QUEUE_NAME_ANNOTATION: "gpu-a100"}}}}
        });
        assert_eq!(
            default_queue_for_resources([&config_map, &job]),
            Some("gpu-a100".to_string())
        );

        let pod = json!({"kind": "Pod", "metadata": {"annotations": {QUEUE_NAME_ANNOTATION: "cpu"}}});
        assert_eq!(default_queue_for_resources([&pod, &job]), Some("cpu".to_string()));
    }

    #[test]
    fn test_no_queue_annotation() {
        let blank = json!({"kind": "Pod", "metadata": {"annotations": {QUEUE_NAME_ANNOTATION: " "}}});
        assert_eq!(default_queue_for_resources([&blank]), None);
        assert_eq!(default_queue_for_resources([]), None);
    }

    #[test]
    fn test_read_only_only_touches_group_claim_mounts() {
        let mut pod = json!({
            "kind": "Pod",
            "spec": {
                "volumes": [
                    {"name": "shared", "persistentVolumeClaim": {"claimName": "datasets"}},
                    {"name": "home", "persistentVolumeClaim": {"claimName": "user-alice-disk"}}
                ],
                "containers": [{
                    "name": "main",
                    "volumeMounts": [
                        {"name": "shared", "mountPath": "/data"},
                        {"name": "home", "mountPath": "/home"}
                    ]
                }]
            }
        });
        enforce_read_only(&mut pod, "datasets");

        let mounts = &pod["spec"]["containers"][0]["volumeMounts"];
        assert_eq!(mounts[0]["readOnly"], true);
        assert!(mounts[1].get("readOnly").is_none());
    }
}
