//! Registry scope grammar and ownership validation.
//!
//! A scope query parameter is a space-separated list of entries of the
//! form `type:name:action,action`. Repository scopes must name a
//! repository under the caller's organization; other scope types pass
//! through unchanged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One granted access entry, serialized into the token's `access`
/// claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub actions: Vec<String>,
}

/// Parse a raw `scope` parameter into access entries.
///
/// Malformed entries (fewer than three `:`-separated parts) are
/// dropped. An empty scope grants the default catalog access.
pub fn parse_scope(scope: &str) -> Vec<AccessEntry> {
    if scope.is_empty() {
        return vec![AccessEntry {
            kind: "registry".to_string(),
            name: "catalog".to_string(),
            actions: vec!["*".to_string()],
        }];
    }

    scope
        .split(' ')
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let kind = parts.next()?;
            let name = parts.next()?;
            let actions = parts.next()?;
            Some(AccessEntry {
                kind: kind.to_string(),
                name: name.to_string(),
                actions: actions.split(',').map(str::to_string).collect(),
            })
        })
        .collect()
}

/// Check that every repository entry names a repository owned by the
/// organization (`<org_id>/...`). One bad entry rejects the whole
/// request.
pub fn validate_scope(access: &[AccessEntry], org_id: Uuid) -> bool {
    let owned_prefix = format!("{org_id}/");
    access
        .iter()
        .filter(|entry| entry.kind == "repository")
        .all(|entry| entry.name.starts_with(&owned_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_grants_catalog_access() {
        let access = parse_scope("");
        assert_eq!(access.len(), 1);
        assert_eq!(access[0].kind, "registry");
        assert_eq!(access[0].name, "catalog");
        assert_eq!(access[0].actions, vec!["*"]);
    }

    #[test]
    fn repository_scope_parses_name_and_actions() {
        let access = parse_scope("repository:acme/web:push,pull");
        assert_eq!(access.len(), 1);
        assert_eq!(access[0].kind, "repository");
        assert_eq!(access[0].name, "acme/web");
        assert_eq!(access[0].actions, vec!["push", "pull"]);
    }

    #[test]
    fn multiple_scopes_are_space_separated() {
        let access = parse_scope("repository:acme/web:pull registry:catalog:*");
        assert_eq!(access.len(), 2);
        assert_eq!(access[1].kind, "registry");
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let access = parse_scope("repository:acme/web");
        assert!(access.is_empty());
    }

    #[test]
    fn owned_repository_scope_validates() {
        let org = Uuid::new_v4();
        let access = parse_scope(&format!("repository:{org}/web:push,pull"));
        assert!(validate_scope(&access, org));
    }

    #[test]
    fn foreign_repository_scope_is_rejected() {
        let org = Uuid::new_v4();
        let access = parse_scope("repository:other-org/web:push");
        assert!(!validate_scope(&access, org));
    }

    #[test]
    fn one_foreign_entry_rejects_the_whole_request() {
        let org = Uuid::new_v4();
        let access = parse_scope(&format!(
            "repository:{org}/web:pull repository:other-org/web:pull"
        ));
        assert!(!validate_scope(&access, org));
    }

    #[test]
    fn non_repository_scopes_pass_through() {
        let org = Uuid::new_v4();
        let access = parse_scope("registry:catalog:*");
        assert!(validate_scope(&access, org));
    }
}
