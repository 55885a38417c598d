use serde::Serialize;
use std::collections::BTreeSet;

/// Set of `resource:action` permission strings with wildcard support.
///
/// `*` grants everything; `resource:*` grants every action on a resource.
/// Backed by a BTreeSet so serialized permission lists are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, permission: impl Into<String>) {
        self.0.insert(permission.into());
    }

    pub fn extend<I, S>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for p in permissions {
            self.0.insert(p.into());
        }
    }

    /// Union another set into this one
    pub fn merge(&mut self, other: &PermissionSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn allows(&self, permission: &str) -> bool {
        if self.0.contains("*") || self.0.contains(permission) {
            return true;
        }
        match permission.split_once(':') {
            Some((resource, _action)) => self.0.contains(&format!("{}:*", resource)),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Validate a permission string as stored on a role: `resource:action`,
/// `resource:*`, or the bare `*` wildcard.
pub fn validate_permission(permission: &str) -> Result<(), String> {
    if permission == "*" {
        return Ok(());
    }
    let (resource, action) = permission
        .split_once(':')
        .ok_or_else(|| format!("'{}' must be 'resource:action'", permission))?;

    let valid_part =
        |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c == '_');

    if !valid_part(resource) {
        return Err(format!("'{}' has an invalid resource segment", permission));
    }
    if action != "*" && !valid_part(action) {
        return Err(format!("'{}' has an invalid action segment", permission));
    }
    Ok(())
}

/// Baseline permissions implied by a user's legacy access level.
///
/// Unknown levels contribute nothing; custom roles and groups still apply.
pub fn legacy_access_permissions(access: &str) -> PermissionSet {
    match access {
        "root" => PermissionSet::from_iter(["*"]),
        "admin" => PermissionSet::from_iter([
            "users:*",
            "roles:*",
            "groups:*",
            "rules:*",
            "businesses:*",
            "audit:read",
        ]),
        "advisor" => PermissionSet::from_iter([
            "users:read",
            "rules:read",
            "businesses:read",
            "businesses:write",
        ]),
        "member" => PermissionSet::from_iter(["businesses:read"]),
        _ => PermissionSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_allows() {
        let set = PermissionSet::from_iter(["users:read"]);
        assert!(set.allows("users:read"));
        assert!(!set.allows("users:write"));
    }

    #[test]
    fn resource_wildcard_allows_any_action() {
        let set = PermissionSet::from_iter(["users:*"]);
        assert!(set.allows("users:read"));
        assert!(set.allows("users:write"));
        assert!(!set.allows("roles:read"));
    }

    #[test]
    fn global_wildcard_allows_everything() {
        let set = PermissionSet::from_iter(["*"]);
        assert!(set.allows("users:read"));
        assert!(set.allows("tenants:manage"));
    }

    #[test]
    fn merge_unions_and_deduplicates() {
        let mut a = PermissionSet::from_iter(["users:read", "roles:read"]);
        let b = PermissionSet::from_iter(["users:read", "rules:read"]);
        a.merge(&b);
        assert_eq!(a.len(), 3);
        assert!(a.allows("rules:read"));
    }

    #[test]
    fn validate_permission_strings() {
        assert!(validate_permission("users:read").is_ok());
        assert!(validate_permission("users:*").is_ok());
        assert!(validate_permission("*").is_ok());
        assert!(validate_permission("users").is_err());
        assert!(validate_permission("Users:read").is_err());
        assert!(validate_permission("users:").is_err());
        assert!(validate_permission(":read").is_err());
    }

    #[test]
    fn legacy_mapping() {
        assert!(legacy_access_permissions("root").allows("tenants:manage"));
        assert!(legacy_access_permissions("admin").allows("rules:write"));
        assert!(!legacy_access_permissions("admin").allows("tenants:manage"));
        assert!(legacy_access_permissions("advisor").allows("businesses:write"));
        assert!(!legacy_access_permissions("advisor").allows("roles:read"));
        assert!(legacy_access_permissions("member").allows("businesses:read"));
        assert!(legacy_access_permissions("intern").is_empty());
    }
}
