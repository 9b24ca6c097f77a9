//! Authentication module for the clamor server.
//!
//! This module provides:
//! - Cookie handling for the access/refresh token pair
//! - sqlx-backed user and role lookups
//! - The per-request authentication and permission middleware
//! - Sign-in, logout, and identity routes
//!
//! # Authorization Model
//!
//! Identity is stateless: every request carries its proof in the token pair,
//! verified by signature and expiry alone. No session rows are kept, which
//! means an already-issued refresh token stays valid until its natural
//! expiry even after rotation overwrites the cookie. Permission changes take
//! effect on the next request because the effective permission set is
//! recomputed from role bindings every time, never cached.
//!
//! The middleware stack populates an [`AuthContext`](clamor_access::AuthContext)
//! on each request; handlers read identity and permissions from it and
//! decide themselves whether to reject anonymous callers.

pub mod cookies;
pub mod db;
pub mod middleware;
pub mod routes;

use crate::config::AuthConfig;
use clamor_access::{PermissionStore, RoleBindingStore, TokenCodec, UserStore};
use db::{RoleRepository, UserRepository};
use sqlx::PgPool;
use std::sync::Arc;

pub use routes::{list_roles, logout, me, sign_in};

/// Path of the logout route. Requests to this path bypass token validation
/// entirely so logout succeeds even with garbage or expired tokens.
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Shared application state.
///
/// The lookup collaborators are held as trait objects so the middleware is
/// decoupled from the sqlx repositories; tests substitute in-memory stores.
pub struct AppState {
    /// Database connection pool.
    pub db_pool: PgPool,
    /// Codec for signing and verifying tokens.
    pub codec: TokenCodec,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// User lookups for session resolution.
    pub users: Arc<dyn UserStore>,
    /// Role binding lookups for permission resolution.
    pub bindings: Arc<dyn RoleBindingStore>,
    /// Permission lookups for permission resolution.
    pub permissions: Arc<dyn PermissionStore>,
}

impl AppState {
    /// Creates application state backed by the sqlx repositories.
    pub fn new(db_pool: PgPool, codec: TokenCodec, auth: AuthConfig) -> Self {
        let users = Arc::new(UserRepository::new(db_pool.clone()));
        let roles = Arc::new(RoleRepository::new(db_pool.clone()));
        Self {
            db_pool,
            codec,
            auth,
            users,
            bindings: roles.clone(),
            permissions: roles,
        }
    }

    /// Creates application state over explicit lookup stores.
    #[cfg(test)]
    pub(crate) fn with_stores(
        db_pool: PgPool,
        codec: TokenCodec,
        auth: AuthConfig,
        users: Arc<dyn UserStore>,
        bindings: Arc<dyn RoleBindingStore>,
        permissions: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            db_pool,
            codec,
            auth,
            users,
            bindings,
            permissions,
        }
    }
}
