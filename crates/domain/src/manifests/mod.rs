//! Manifest documents: splitting, conversion and validation.

mod quantity;
mod schema;

pub use quantity::Quantity;
pub use schema::{
    ClaimSourceView, ContainerView, ManifestKind, ObjectHeader, ObjectMetaView, PodSpecView,
    ResourceRequirementsView, VolumeView,
};

use crate::shared_kernel::{DomainError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Resources compared by the limit >= request rule
const LIMITED_RESOURCES: [&str; 2] = ["cpu", "memory"];

/// One document of a multi-document manifest, converted to JSON and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    /// 1-based position within the manifest
    pub index: usize,
    pub api_version: String,
    pub kind: String,
    pub normalized_kind: String,
    pub name: String,
    pub payload: Value,
}

impl ManifestDocument {
    pub fn manifest_kind(&self) -> ManifestKind {
        ManifestKind::classify(&self.kind)
    }
}

/// Splits raw text on `---` separator lines, dropping blank documents.
pub fn split_documents(raw: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = Vec::new();

    for line in raw.lines() {
        if line.trim_end() == "---" {
            push_document(&mut documents, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_document(&mut documents, &current);

    documents
}

fn push_document(documents: &mut Vec<String>, lines: &[&str]) {
    let doc = lines.join("\n");
    let doc = doc.trim();
    if !doc.is_empty() {
        documents.push(doc.to_string());
    }
}

/// Parses every document of `raw`. The first failing document aborts the
/// whole manifest.
pub fn parse_manifest(raw: &str) -> Result<Vec<ManifestDocument>> {
    let documents = split_documents(raw);
    if documents.is_empty() {
        return Err(DomainError::NoValidDocuments);
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| parse_document(i + 1, doc))
        .collect()
}

pub fn parse_document(index: usize, doc: &str) -> Result<ManifestDocument> {
    let payload: Value =
        serde_yaml::from_str(doc).map_err(|e| DomainError::DocumentConversion {
            index,
            message: e.to_string(),
        })?;

    // structure before limits: a document without a header reports that first
    let (api_version, kind, name) =
        validate_structure(&payload).map_err(|e| DomainError::DocumentSpec {
            index,
            message: e.to_string(),
        })?;

    validate_container_limits(&payload).map_err(|e| DomainError::DocumentValidation {
        index,
        message: e.to_string(),
    })?;

    Ok(ManifestDocument {
        index,
        normalized_kind: normalize_kind(&kind),
        api_version,
        kind,
        name,
        payload,
    })
}

/// Checks the object carries `apiVersion`, `kind` and `metadata.name`.
pub fn validate_structure(payload: &Value) -> Result<(String, String, String)> {
    let header = ObjectHeader::deserialize(payload).unwrap_or_default();

    let kind = header.kind.filter(|k| !k.trim().is_empty());
    let api_version = header.api_version.filter(|v| !v.trim().is_empty());
    let (Some(kind), Some(api_version)) = (kind, api_version) else {
        return Err(DomainError::InvalidManifest {
            message: "object is missing kind or apiVersion".to_string(),
        });
    };

    let name = header
        .metadata
        .and_then(|m| m.name)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| DomainError::InvalidManifest {
            message: "object is missing metadata.name".to_string(),
        })?;

    Ok((api_version, kind, name))
}

/// For every container declaring both a request and a limit for cpu or
/// memory, the limit must not be below the request. Quantities that do not
/// parse are not compared.
pub fn validate_container_limits(payload: &Value) -> Result<()> {
    let kind = payload
        .get("kind")
        .and_then(Value::as_str)
        .map(ManifestKind::classify)
        .unwrap_or(ManifestKind::Opaque);

    let Some(spec) = kind.pod_spec_view(payload) else {
        return Ok(());
    };

    for container in spec.all_containers() {
        let Some(resources) = &container.resources else {
            continue;
        };
        let (Some(requests), Some(limits)) = (&resources.requests, &resources.limits) else {
            continue;
        };

        for resource in LIMITED_RESOURCES {
            let request = requests.get(resource).and_then(Quantity::from_json);
            let limit = limits.get(resource).and_then(Quantity::from_json);
            if let (Some(request), Some(limit)) = (request, limit) {
                if limit < request {
                    return Err(DomainError::ContainerLimitViolation {
                        container: container.name.clone(),
                        resource: resource.to_string(),
                        limit: limit.raw().to_string(),
                        request: request.raw().to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Canonical capitalisation for resource kinds.
pub fn normalize_kind(kind: &str) -> String {
    let canonical = match kind.to_ascii_lowercase().as_str() {
        "pod" => "Pod",
        "service" => "Service",
        "deployment" => "Deployment",
        "configmap" => "ConfigMap",
        "ingress" => "Ingress",
        "job" => "Job",
        "cronjob" => "CronJob",
        "persistentvolumeclaim" => "PersistentVolumeClaim",
        "secret" => "Secret",
        "statefulset" => "StatefulSet",
        "daemonset" => "DaemonSet",
        _ => {
            let mut chars = kind.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            };
        }
    };
    canonical.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_with_resources(requests: &str, limits: &str) -> String {
        format!(
            r#"apiVersion: v1
kind: Pod
metadata:
  name: trainer
spec:
  containers:
    - name: main
      image: pytorch:latest
      resources:
        requests: {requests}
        limits: {limits}
"#
        )
    }

    #[test]
    fn test_split_documents() {
        let raw = "\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n---\n";
        let docs = split_documents(raw);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].ends_with("name: a"));
        assert!(docs[1].starts_with("apiVersion: v1"));
    }

    #[test]
    fn test_split_only_separators() {
        assert!(split_documents("---").is_empty());
        assert!(split_documents("").is_empty());
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        assert!(matches!(
            parse_manifest("---\n---\n"),
            Err(DomainError::NoValidDocuments)
        ));
    }

    #[test]
    fn test_limit_below_request_fails() {
        let doc = pod_with_resources("{cpu: 500m}", "{cpu: 200m}");
        let err = parse_manifest(&doc).unwrap_err();
        assert!(matches!(err, DomainError::DocumentValidation { index: 1, .. }));
        let msg = err.to_string();
        assert!(msg.contains("container 'main'"));
        assert!(msg.contains("200m"));
        assert!(msg.contains("500m"));
    }

    #[test]
    fn test_limit_above_request_passes() {
        let doc = pod_with_resources("{cpu: 200m, memory: 1Gi}", "{cpu: 500m, memory: 2Gi}");
        let parsed = parse_manifest(&doc).unwrap();
        assert_eq!(parsed[0].name, "trainer");
        assert_eq!(parsed[0].normalized_kind, "Pod");
    }

    #[test]
    fn test_memory_limit_violation_in_init_container() {
        let doc = r#"apiVersion: batch/v1
kind: Job
metadata:
  name: prep
spec:
  template:
    spec:
      initContainers:
        - name: fetch
          resources:
            requests: {memory: 2Gi}
            limits: {memory: 1Gi}
      containers:
        - name: main
"#;
        let err = parse_manifest(doc).unwrap_err();
        assert!(err.to_string().contains("container 'fetch': memory limit (1Gi)"));
    }

    #[test]
    fn test_no_requests_or_limits_is_valid() {
        let doc = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: bare\nspec:\n  containers:\n    - name: main\n";
        assert!(parse_manifest(doc).is_ok());

        let only_limits = pod_with_resources("null", "{cpu: 100m}");
        assert!(parse_manifest(&only_limits).is_ok());
    }

    #[test]
    fn test_error_reports_failing_document_index() {
        let raw = format!(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: ok\n---\n{}",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  labels: {}\n"
        );
        let err = parse_manifest(&raw).unwrap_err();
        assert!(matches!(err, DomainError::DocumentSpec { index: 2, .. }));
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_structure_is_checked_before_limits() {
        let doc = r#"kind: Pod
spec:
  containers:
    - name: main
      resources:
        requests: {cpu: "2"}
        limits: {cpu: "1"}
"#;
        let err = parse_manifest(doc).unwrap_err();
        assert!(matches!(err, DomainError::DocumentSpec { index: 1, .. }));
        assert!(err.to_string().contains("missing kind or apiVersion"));
    }

    #[test]
    fn test_missing_kind_is_rejected() {
        let err = parse_manifest("apiVersion: v1\nmetadata:\n  name: x\n").unwrap_err();
        assert!(err.to_string().contains("missing kind or apiVersion"));
    }

    #[test]
    fn test_invalid_yaml_is_a_conversion_error() {
        let err = parse_manifest("kind: [unclosed").unwrap_err();
        assert!(matches!(err, DomainError::DocumentConversion { index: 1, .. }));
    }

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("pod"), "Pod");
        assert_eq!(normalize_kind("CONFIGMAP"), "ConfigMap");
        assert_eq!(normalize_kind("cronjob"), "CronJob");
        assert_eq!(normalize_kind("flashJOB"), "Flashjob");
        assert_eq!(normalize_kind("workflow"), "Workflow");
        assert_eq!(normalize_kind(""), "");
    }
}
