//! Roles and permission sets.
//!
//! A permission is an opaque capability string (for example
//! `project_apikey_create`) checked by downstream authorization. Roles bundle
//! permissions; a user's effective permission set is the union across every
//! role bound to them. No permission is ever inferred from a role's name —
//! the explicit bindings are the only source of truth.

use clamor_core::RoleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An opaque capability string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Creates a permission from a capability string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the capability string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Keyed lookups by bare capability string; consistent with the derived
// ordering since Permission orders by its inner string.
impl std::borrow::Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A set of permissions, derived per request and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns true if the set grants the given capability.
    #[must_use]
    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Adds a permission to the set.
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Merges another set into this one.
    pub fn extend(&mut self, other: PermissionSet) {
        self.0.extend(other.0);
    }

    /// Returns the union of this set and another.
    #[must_use]
    pub fn union(mut self, other: PermissionSet) -> Self {
        self.extend(other);
        self
    }

    /// Returns the number of permissions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the permissions in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A named role bundling a set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier for this role.
    id: RoleId,
    /// Human-readable role name.
    name: String,
    /// The permissions this role confers.
    permissions: PermissionSet,
}

impl Role {
    /// Creates a new role with a generated ID.
    #[must_use]
    pub fn new(name: String, permissions: PermissionSet) -> Self {
        Self {
            id: RoleId::new(),
            name,
            permissions,
        }
    }

    /// Creates a role with all fields specified.
    #[must_use]
    pub fn with_all_fields(id: RoleId, name: String, permissions: PermissionSet) -> Self {
        Self {
            id,
            name,
            permissions,
        }
    }

    /// Returns the role's ID.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the permissions this role confers.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }
}
