//! Substrate naming and status interpretation shared by
//! Kubernetes-backed adapters.
//!
//! Every organization gets its own namespace, `mc-org-<org_id>`;
//! unscoped services fall back to a configured default namespace.
//! Readiness is read from the Knative-style `Ready` condition of the
//! resource's status document.

use maxcloud_core::models::service::{Service, ServiceStatus};
use serde_json::Value;
use uuid::Uuid;

use crate::DeployResult;

/// Prefix of per-organization namespaces.
pub const ORG_NAMESPACE_PREFIX: &str = "mc-org-";

/// Namespace for an organization.
pub fn namespace_for_org(org_id: Uuid) -> String {
    format!("{ORG_NAMESPACE_PREFIX}{org_id}")
}

/// Namespace a service's resources live in.
pub fn namespace_for_service(svc: &Service, default_namespace: &str) -> String {
    match svc.org_id {
        Some(org_id) => namespace_for_org(org_id),
        None => default_namespace.to_string(),
    }
}

/// Interpret a substrate resource document into a [`DeployResult`].
///
/// Reads `status.url` and the `status.conditions` entry with
/// `type == "Ready"`: `"True"` means ready, `"False"` failed, anything
/// else (including a missing condition) still pending.
pub fn parse_ready_condition(resource: &Value) -> DeployResult {
    let mut result = DeployResult {
        status: ServiceStatus::Pending,
        url: String::new(),
    };

    if let Some(url) = resource
        .pointer("/status/url")
        .and_then(Value::as_str)
    {
        result.url = url.to_string();
    }

    let Some(conditions) = resource
        .pointer("/status/conditions")
        .and_then(Value::as_array)
    else {
        return result;
    };

    for condition in conditions {
        if condition.get("type").and_then(Value::as_str) != Some("Ready") {
            continue;
        }
        result.status = match condition.get("status").and_then(Value::as_str) {
            Some("True") => ServiceStatus::Ready,
            Some("False") => ServiceStatus::Failed,
            _ => ServiceStatus::Pending,
        };
        break;
    }

    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn org_namespace_uses_prefix() {
        let org = Uuid::new_v4();
        assert_eq!(namespace_for_org(org), format!("mc-org-{org}"));
    }

    #[test]
    fn unscoped_service_falls_back_to_default_namespace() {
        let now = chrono::Utc::now();
        let mut svc = Service {
            id: Uuid::new_v4(),
            org_id: None,
            name: "web".into(),
            image: "nginx:1".into(),
            status: ServiceStatus::Pending,
            url: String::new(),
            port: None,
            command: Vec::new(),
            args: Vec::new(),
            env_vars: Default::default(),
            min_scale: 0,
            max_scale: 10,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(namespace_for_service(&svc, "default"), "default");

        let org = Uuid::new_v4();
        svc.org_id = Some(org);
        assert_eq!(
            namespace_for_service(&svc, "default"),
            format!("mc-org-{org}")
        );
    }

    #[test]
    fn ready_condition_true_is_ready() {
        let resource = json!({
            "status": {
                "url": "https://web.example.com",
                "conditions": [
                    {"type": "ConfigurationsReady", "status": "True"},
                    {"type": "Ready", "status": "True"},
                ]
            }
        });
        let result = parse_ready_condition(&resource);
        assert_eq!(result.status, ServiceStatus::Ready);
        assert_eq!(result.url, "https://web.example.com");
    }

    #[test]
    fn ready_condition_false_is_failed() {
        let resource = json!({
            "status": {
                "conditions": [{"type": "Ready", "status": "False"}]
            }
        });
        assert_eq!(
            parse_ready_condition(&resource).status,
            ServiceStatus::Failed
        );
    }

    #[test]
    fn unknown_condition_status_stays_pending() {
        let resource = json!({
            "status": {
                "conditions": [{"type": "Ready", "status": "Unknown"}]
            }
        });
        assert_eq!(
            parse_ready_condition(&resource).status,
            ServiceStatus::Pending
        );
    }

    #[test]
    fn missing_status_stays_pending() {
        let resource = json!({"metadata": {"name": "web"}});
        let result = parse_ready_condition(&resource);
        assert_eq!(result.status, ServiceStatus::Pending);
        assert_eq!(result.url, "");
    }
}
