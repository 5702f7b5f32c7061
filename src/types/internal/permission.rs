use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single grantable permission
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, poem_openapi::Enum,
)]
#[serde(rename_all = "lowercase")]
#[oai(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Delete,
    Admin,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::Read,
        Permission::Write,
        Permission::Delete,
        Permission::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized set of permissions held by a user.
///
/// Holding `admin` always implies every other permission, so a set that
/// contains `admin` is expanded to the full set on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        let mut set: BTreeSet<Permission> = permissions.into_iter().collect();
        if set.contains(&Permission::Admin) {
            set.extend(Permission::ALL);
        }
        Self(set)
    }

    /// Every permission, including `admin`
    pub fn all() -> Self {
        Self::new([Permission::Admin])
    }

    /// Default grant for newly created accounts
    pub fn read_only() -> Self {
        Self::new([Permission::Read])
    }

    /// True if `permission` is granted directly or through `admin`
    pub fn allows(&self, permission: Permission) -> bool {
        self.0.contains(&permission) || self.0.contains(&Permission::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.0.contains(&Permission::Admin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Permission> {
        self.0.iter().copied().collect()
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(value: Vec<Permission>) -> Self {
        Self::new(value)
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(value: PermissionSet) -> Self {
        value.0.into_iter().collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_implies_every_permission() {
        let set = PermissionSet::new([Permission::Admin]);

        for permission in Permission::ALL {
            assert!(set.allows(permission));
        }
        assert_eq!(set.to_vec().len(), 4);
    }

    #[test]
    fn test_plain_set_does_not_escalate() {
        let set = PermissionSet::new([Permission::Read, Permission::Write]);

        assert!(set.allows(Permission::Read));
        assert!(set.allows(Permission::Write));
        assert!(!set.allows(Permission::Delete));
        assert!(!set.is_admin());
    }

    #[test]
    fn test_serde_normalizes_on_deserialize() {
        let set: PermissionSet = serde_json::from_str(r#"["admin"]"#).unwrap();
        assert_eq!(set, PermissionSet::all());

        let json = serde_json::to_string(&PermissionSet::read_only()).unwrap();
        assert_eq!(json, r#"["read"]"#);
    }
}
