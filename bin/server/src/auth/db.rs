//! Database repositories for users, role bindings, and permissions.
//!
//! These implement the lookup collaborator traits from `clamor-access`.
//! Database failures map to `StoreError` so the middleware can distinguish
//! "store unreachable" from "legitimately empty result".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clamor_access::{
    Permission, PermissionSet, PermissionStore, Role, RoleBindingStore, StoreError, User,
    UserStore, UserTier,
};
use clamor_core::{RoleId, UserId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: Option<String>,
    tier: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, sqlx::Error> {
        let id = UserId::from_str(&self.id).map_err(|e| decode_error(&self.id, &e))?;
        let tier = match self.tier.as_str() {
            "general" => UserTier::General,
            "super" => UserTier::Super,
            other => {
                return Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unknown user tier '{}'", other),
                ))));
            }
        };
        Ok(User::with_all_fields(
            id,
            self.email,
            self.display_name,
            tier,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn decode_error(value: &str, e: &dyn std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("invalid id '{}': {}", value, e),
    )))
}

/// A user together with their stored password hash, for sign-in.
pub struct UserCredentials {
    /// The user record.
    pub user: User,
    /// Argon2 password hash in PHC string format.
    pub password_hash: String,
}

/// Repository for user operations.
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a user by their internal ID.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name, tier, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_user()?)),
            None => Ok(None),
        }
    }

    /// Finds a user and their password hash by email, for sign-in.
    ///
    /// Users provisioned without a password (for example via an external
    /// identity provider) are not returned.
    pub async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, sqlx::Error> {
        #[derive(FromRow)]
        struct CredentialRow {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: String,
        }

        let row: Option<CredentialRow> = sqlx::query_as(
            r#"
            SELECT id, email, display_name, tier, created_at, updated_at, password_hash
            FROM users
            WHERE email = $1 AND password_hash IS NOT NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(UserCredentials {
                user: r.user.try_into_user()?,
                password_hash: r.password_hash,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        UserRepository::find_by_id(self, id)
            .await
            .map_err(|e| StoreError::new(e.to_string()))
    }
}

/// Repository for role binding and permission operations.
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Creates a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the IDs of every role bound to the user.
    pub async fn role_ids_for_user(&self, user_id: UserId) -> Result<Vec<RoleId>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT role_id
            FROM role_bindings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id,)| RoleId::from_str(&id).map_err(|e| decode_error(&id, &e)))
            .collect()
    }

    /// Lists every role with its permissions.
    pub async fn list_roles(&self) -> Result<Vec<Role>, sqlx::Error> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, p.permission
            FROM roles r
            LEFT JOIN role_permissions p ON p.role_id = r.id
            ORDER BY r.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: Vec<(RoleId, String, PermissionSet)> = Vec::new();
        for (id, name, permission) in rows {
            let id = RoleId::from_str(&id).map_err(|e| decode_error(&id, &e))?;
            if grouped.last().is_none_or(|(last_id, _, _)| *last_id != id) {
                grouped.push((id, name, PermissionSet::empty()));
            }
            if let (Some(permission), Some((_, _, permissions))) = (permission, grouped.last_mut())
            {
                permissions.insert(Permission::from(permission));
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(id, name, permissions)| Role::with_all_fields(id, name, permissions))
            .collect())
    }

    /// Returns the union of permission strings across the given roles.
    pub async fn permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> Result<PermissionSet, sqlx::Error> {
        let ids: Vec<String> = role_ids.iter().map(RoleId::to_string).collect();
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT permission
            FROM role_permissions
            WHERE role_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(permission,)| Permission::from(permission))
            .collect())
    }
}

#[async_trait]
impl RoleBindingStore for RoleRepository {
    async fn role_ids_for_user(&self, user_id: UserId) -> Result<Vec<RoleId>, StoreError> {
        RoleRepository::role_ids_for_user(self, user_id)
            .await
            .map_err(|e| StoreError::new(e.to_string()))
    }
}

#[async_trait]
impl PermissionStore for RoleRepository {
    async fn permissions_for_roles(
        &self,
        role_ids: &[RoleId],
    ) -> Result<PermissionSet, StoreError> {
        RoleRepository::permissions_for_roles(self, role_ids)
            .await
            .map_err(|e| StoreError::new(e.to_string()))
    }
}
