//! The typed per-request authentication context.
//!
//! Handlers consume identity and permissions through this struct rather
//! than through dynamically attached request properties. It is built once
//! per request, after session resolution and permission resolution have
//! both completed, and is immutable from then on.

use crate::role::PermissionSet;
use crate::user::User;
use clamor_core::UserId;

/// The resolved identity and effective permissions of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user: Option<User>,
    permissions: PermissionSet,
}

impl AuthContext {
    /// Creates the context for an anonymous request.
    ///
    /// Anonymous requests always carry the empty permission set.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user: None,
            permissions: PermissionSet::empty(),
        }
    }

    /// Creates the context for an authenticated request.
    #[must_use]
    pub fn authenticated(user: User, permissions: PermissionSet) -> Self {
        Self {
            user: Some(user),
            permissions,
        }
    }

    /// Returns the resolved user, if the request is authenticated.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Returns the authenticated user's ID, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(User::id)
    }

    /// Returns the request's effective permission set.
    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns true if the request is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns true if the request carries the given capability.
    #[must_use]
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::anonymous()
    }
}
