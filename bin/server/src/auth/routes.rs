//! Authentication routes: sign-in, logout, and identity.

use argon2::{Argon2, PasswordVerifier, password_hash::PasswordHash};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use clamor_access::{CookieMutation, Permission, TokenKind, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    AppState, cookies,
    db::{RoleRepository, UserRepository},
    middleware::{AuthRejection, OptionalAuth, RequireAuth},
};

/// Permission required to read role definitions.
const ROLE_READ: &str = "role_read";

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

/// User fields exposed to API clients.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    id: String,
    email: String,
    display_name: Option<String>,
    tier: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().to_string(),
            display_name: user.display_name().map(str::to_string),
            tier: if user.tier().is_super() {
                "super".to_string()
            } else {
                "general".to_string()
            },
        }
    }
}

/// Response body for the identity route.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    user: Option<UserResponse>,
    permissions: Vec<String>,
}

/// Signs a user in with email and password, setting the token pair cookies.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let users = UserRepository::new(state.db_pool.clone());
    let credentials = users
        .find_credentials_by_email(&body.email)
        .await
        .map_err(|e| AuthError::Database(e.to_string()))?
        .ok_or(AuthError::InvalidCredentials)?;

    let hash = PasswordHash::new(&credentials.password_hash)
        .map_err(|e| AuthError::Database(format!("stored password hash is invalid: {}", e)))?;
    Argon2::default()
        .verify_password(body.password.as_bytes(), &hash)
        .map_err(|_| AuthError::InvalidCredentials)?;

    let user = credentials.user;
    let mutations = [TokenKind::Access, TokenKind::Refresh]
        .into_iter()
        .map(|kind| {
            state
                .codec
                .sign(user.id(), kind)
                .map(|value| CookieMutation::Set {
                    kind,
                    value,
                    max_age_secs: state.codec.ttl_secs(kind),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AuthError::Signing(e.to_string()))?;

    let jar = cookies::apply_mutations(jar, &mutations, &state.auth);
    tracing::info!(user_id = %user.id(), "user signed in");

    Ok((jar, Json(UserResponse::from(&user))))
}

/// Logs the user out by clearing both token cookies.
///
/// Never validates the presented tokens: logout succeeds even when they are
/// garbage or expired.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let jar = cookies::apply_mutations(
        jar,
        &[
            CookieMutation::Clear {
                kind: TokenKind::Access,
            },
            CookieMutation::Clear {
                kind: TokenKind::Refresh,
            },
        ],
        &state.auth,
    );

    (jar, StatusCode::NO_CONTENT)
}

/// Returns the request's resolved identity and effective permission set.
pub async fn me(OptionalAuth(context): OptionalAuth) -> Json<MeResponse> {
    Json(MeResponse {
        user: context.user().map(UserResponse::from),
        permissions: context
            .permissions()
            .iter()
            .map(Permission::to_string)
            .collect(),
    })
}

/// Role fields exposed to API clients.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    id: String,
    name: String,
    permissions: Vec<String>,
}

impl From<&clamor_access::Role> for RoleResponse {
    fn from(role: &clamor_access::Role) -> Self {
        Self {
            id: role.id().to_string(),
            name: role.name().to_string(),
            permissions: role.permissions().iter().map(Permission::to_string).collect(),
        }
    }
}

/// Lists every role and its permissions. Requires the `role_read` permission.
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    RequireAuth(context): RequireAuth,
) -> Result<Json<Vec<RoleResponse>>, AuthRejection> {
    if !context.can(ROLE_READ) {
        return Err(AuthRejection::PermissionDenied);
    }

    let roles = RoleRepository::new(state.db_pool.clone())
        .list_roles()
        .await
        .map_err(|e| {
            tracing::error!("Database error: {}", e);
            AuthRejection::InternalError
        })?;

    Ok(Json(roles.iter().map(RoleResponse::from).collect()))
}

/// Errors from the authentication routes.
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    Database(String),
    Signing(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password"),
            Self::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            Self::Signing(msg) => {
                tracing::error!("Token signing failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
