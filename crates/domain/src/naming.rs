//! Kubernetes-safe names for tenant namespaces.

/// Upper bound for DNS-1123 labels
pub const MAX_K8S_NAME_LEN: usize = 63;

/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, trims hyphens and caps the result at 63 characters.
/// Returns `unnamed` when nothing usable is left.
pub fn to_safe_k8s_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    cap_name(out)
}

/// Namespace of a project for one user: `{prefix}-{project}-{safe_username}`
pub fn project_namespace(prefix: &str, project_id: &str, safe_username: &str) -> String {
    cap_name(to_safe_k8s_name(&format!(
        "{}-{}-{}",
        prefix, project_id, safe_username
    )))
}

fn cap_name(mut name: String) -> String {
    if name.len() > MAX_K8S_NAME_LEN {
        name.truncate(MAX_K8S_NAME_LEN);
    }
    let trimmed = name.trim_end_matches('-');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
