//! Lookup collaborator traits.
//!
//! These are the only suspension points in the request pipeline: the token
//! codec never blocks, but user and role lookups hit an external data store.
//! Implementations live with the server (sqlx repositories); tests use
//! in-memory fakes.

use async_trait::async_trait;
use clamor_core::{RoleId, UserId};

use crate::error::StoreError;
use crate::role::PermissionSet;
use crate::user::User;

/// Resolves a user record from a token subject.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by ID. `Ok(None)` means the user does not exist;
    /// `Err` means the store itself failed and the request must not proceed.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
}

/// Resolves the roles bound to a user.
#[async_trait]
pub trait RoleBindingStore: Send + Sync {
    /// Returns the IDs of every role bound to the user. A user with no
    /// bindings yields an empty list, not an error.
    async fn role_ids_for_user(&self, user_id: UserId) -> Result<Vec<RoleId>, StoreError>;
}

/// Resolves the permissions conferred by a set of roles.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Returns the union of permission strings across the given roles.
    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> Result<PermissionSet, StoreError>;
}
