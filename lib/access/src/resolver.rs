//! Effective permission resolution.
//!
//! Runs strictly after session resolution: it takes the already-resolved
//! user and never re-verifies tokens. The effective permission set is the
//! union of the permissions of every role bound to the user, recomputed on
//! each request. Role names carry no meaning here; any "owner role has every
//! permission" convention is a data-seeding concern upstream of this crate.

use crate::error::StoreError;
use crate::role::PermissionSet;
use crate::store::{PermissionStore, RoleBindingStore};
use crate::user::User;

/// Computes the request's effective permission set.
#[derive(Debug)]
pub struct PermissionResolver<'a, B: RoleBindingStore + ?Sized, P: PermissionStore + ?Sized> {
    bindings: &'a B,
    permissions: &'a P,
}

impl<'a, B: RoleBindingStore + ?Sized, P: PermissionStore + ?Sized> PermissionResolver<'a, B, P> {
    /// Creates a resolver over the given lookup collaborators.
    #[must_use]
    pub fn new(bindings: &'a B, permissions: &'a P) -> Self {
        Self {
            bindings,
            permissions,
        }
    }

    /// Resolves the effective permission set for the given user.
    ///
    /// An anonymous request (`None`) and a user bound to zero roles both
    /// yield the empty set; neither is an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when a lookup collaborator fails. A failed
    /// lookup is never collapsed into an empty set.
    pub async fn resolve(&self, user: Option<&User>) -> Result<PermissionSet, StoreError> {
        let Some(user) = user else {
            return Ok(PermissionSet::empty());
        };

        let role_ids = self.bindings.role_ids_for_user(user.id()).await?;
        if role_ids.is_empty() {
            return Ok(PermissionSet::empty());
        }

        let permissions = self.permissions.permissions_for_roles(&role_ids).await?;
        tracing::trace!(
            user_id = %user.id(),
            roles = role_ids.len(),
            permissions = permissions.len(),
            "resolved effective permissions"
        );
        Ok(permissions)
    }
}
