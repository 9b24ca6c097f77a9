//! Authentication middleware and extractors for Axum.
//!
//! Two layers run on every request, in order:
//!
//! 1. [`authenticate`] — extracts the token pair, runs the session state
//!    machine (including refresh rotation), and records the resolved user.
//!    Cookie mutations are applied once to the response after the inner
//!    stack has run, so an aborted request never observes a partial write.
//! 2. [`resolve_permissions`] — computes the effective permission set for
//!    the resolved user and attaches the final [`AuthContext`].
//!
//! Neither layer rejects anonymous requests; that decision belongs to the
//! handlers, via the [`RequireAuth`] extractor or explicit permission
//! checks. Lookup store failures do fail the request here — they are never
//! misreported as an anonymous or permissionless session.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use clamor_access::{AuthContext, PermissionResolver, SessionManager, User};
use std::sync::Arc;

use super::{AppState, LOGOUT_PATH, cookies};

/// Request extension recording the user resolved by [`authenticate`].
/// Consumed by [`resolve_permissions`].
#[derive(Debug, Clone)]
struct ResolvedUser(Option<User>);

/// Session-resolution middleware.
///
/// Requests to the logout path skip validation entirely: logout must always
/// succeed, even with garbage or expired tokens.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == LOGOUT_PATH {
        request.extensions_mut().insert(ResolvedUser(None));
        return next.run(request).await;
    }

    let tokens = cookies::extract_tokens(&jar, request.headers(), &state.auth);
    let manager = SessionManager::new(&state.codec, state.users.as_ref());

    let outcome = match manager.resolve(&tokens).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "session resolution failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    request.extensions_mut().insert(ResolvedUser(outcome.user));
    let response = next.run(request).await;

    // A handler that wrote the token cookies itself (sign-in) has issued a
    // new session; rotation for the stale inbound tokens must not override
    // it, or a shared browser would keep the old identity.
    if outcome.mutations.is_empty()
        || cookies::sets_token_cookie(response.headers(), &state.auth)
    {
        return response;
    }

    // Single point of cookie mutation for the whole request.
    let jar = cookies::apply_mutations(jar, &outcome.mutations, &state.auth);
    (jar, response).into_response()
}

/// Permission-resolution middleware. Must be layered inside [`authenticate`];
/// it never re-verifies tokens.
pub async fn resolve_permissions(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(ResolvedUser(user)) = request.extensions().get::<ResolvedUser>().cloned() else {
        tracing::error!("permission resolution ran before session resolution");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let resolver = PermissionResolver::new(state.bindings.as_ref(), state.permissions.as_ref());

    let permissions = match resolver.resolve(user.as_ref()).await {
        Ok(permissions) => permissions,
        Err(e) => {
            tracing::error!(error = %e, "permission lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let context = match user {
        Some(user) => AuthContext::authenticated(user, permissions),
        None => AuthContext::anonymous(),
    };
    request.extensions_mut().insert(context);

    next.run(request).await
}

/// Extractor for the request's authentication context, anonymous or not.
pub struct OptionalAuth(pub AuthContext);

impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(OptionalAuth)
            .ok_or(AuthRejection::InternalError)
    }
}

/// Extractor for requiring an authenticated user.
pub struct RequireAuth(pub AuthContext);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuth(context) = OptionalAuth::from_request_parts(parts, state).await?;

        if !context.is_authenticated() {
            return Err(AuthRejection::NotAuthenticated);
        }

        Ok(RequireAuth(context))
    }
}

/// Rejection type for authentication extractors and permission checks.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
    PermissionDenied,
    InternalError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required").into_response()
            }
            Self::PermissionDenied => (StatusCode::FORBIDDEN, "Permission denied").into_response(),
            Self::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::routes;
    use crate::config::AuthConfig;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{self, Body},
        http::{Request, header},
        middleware::from_fn_with_state,
        routing::{get, post},
    };
    use clamor_access::{
        CookieMutation, Permission, PermissionSet, PermissionStore, RoleBindingStore, StoreError,
        TokenCodec, TokenKind, UserStore, UserTier,
    };
    use clamor_core::{RoleId, UserId};
    use sqlx::PgPool;
    use std::collections::HashMap;
    use tower::ServiceExt;

    struct InMemoryUsers(HashMap<UserId, User>);

    #[async_trait]
    impl UserStore for InMemoryUsers {
        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct InMemoryRoles {
        bindings: HashMap<UserId, Vec<RoleId>>,
        permissions: HashMap<RoleId, Vec<&'static str>>,
        failing: bool,
    }

    #[async_trait]
    impl RoleBindingStore for InMemoryRoles {
        async fn role_ids_for_user(&self, user_id: UserId) -> Result<Vec<RoleId>, StoreError> {
            if self.failing {
                return Err(StoreError::new("role store unreachable"));
            }
            Ok(self.bindings.get(&user_id).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl PermissionStore for InMemoryRoles {
        async fn permissions_for_roles(
            &self,
            role_ids: &[RoleId],
        ) -> Result<PermissionSet, StoreError> {
            if self.failing {
                return Err(StoreError::new("permission store unreachable"));
            }
            Ok(role_ids
                .iter()
                .flat_map(|id| self.permissions.get(id).into_iter().flatten())
                .map(|tag| Permission::from(*tag))
                .collect())
        }
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            secret: "middleware-test-secret-long-enough-to-use".to_string(),
            access_cookie: "access_token".to_string(),
            refresh_cookie: "refresh_token".to_string(),
            cookie_domain: None,
            access_ttl_secs: 3600,
            refresh_ttl_secs: 86400 * 14,
            secure_cookies: false,
        }
    }

    fn test_state(user: Option<&User>, tags: &[&'static str], failing: bool) -> Arc<AppState> {
        let config = auth_config();
        let codec = TokenCodec::new(&config.token_config()).expect("codec");

        let mut users = HashMap::new();
        let mut bindings = HashMap::new();
        let mut permissions = HashMap::new();
        if let Some(user) = user {
            users.insert(user.id(), user.clone());
            let role_id = RoleId::new();
            bindings.insert(user.id(), vec![role_id]);
            permissions.insert(role_id, tags.to_vec());
        }
        let roles = Arc::new(InMemoryRoles {
            bindings,
            permissions,
            failing,
        });

        Arc::new(AppState::with_stores(
            PgPool::connect_lazy("postgres://unused/unused").expect("lazy pool"),
            codec,
            config,
            Arc::new(InMemoryUsers(users)),
            roles.clone(),
            roles,
        ))
    }

    async fn whoami(OptionalAuth(context): OptionalAuth) -> String {
        match context.user_id() {
            Some(id) => {
                let tags: Vec<String> = context
                    .permissions()
                    .iter()
                    .map(Permission::to_string)
                    .collect();
                format!("{}:{}", id, tags.join(","))
            }
            None => "anonymous".to_string(),
        }
    }

    /// Stand-in for sign-in: issues its own token cookies.
    async fn issue_cookies(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
        let jar = cookies::apply_mutations(
            jar,
            &[
                CookieMutation::Set {
                    kind: TokenKind::Access,
                    value: "handler-access".to_string(),
                    max_age_secs: 3600,
                },
                CookieMutation::Set {
                    kind: TokenKind::Refresh,
                    value: "handler-refresh".to_string(),
                    max_age_secs: 86400 * 14,
                },
            ],
            &state.auth,
        );
        (jar, "signed in")
    }

    fn test_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/signin", post(issue_cookies))
            .route(LOGOUT_PATH, post(routes::logout))
            .layer(from_fn_with_state(state.clone(), resolve_permissions))
            .layer(from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), 4096)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn logout_succeeds_with_garbage_tokens() {
        let router = test_router(test_state(None, &[], false));

        let request = Request::builder()
            .method("POST")
            .uri(LOGOUT_PATH)
            .header(header::COOKIE, "access_token=garbage; refresh_token=garbage")
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cleared = set_cookies(&response);
        assert!(
            cleared
                .iter()
                .any(|c| c.starts_with("access_token=;") && c.contains("Max-Age=0"))
        );
        assert!(
            cleared
                .iter()
                .any(|c| c.starts_with("refresh_token=;") && c.contains("Max-Age=0"))
        );
    }

    #[tokio::test]
    async fn garbage_tokens_degrade_to_anonymous_and_clear_cookies() {
        let router = test_router(test_state(None, &[], false));

        let request = Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, "access_token=garbage; refresh_token=garbage")
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let cleared = set_cookies(&response);
        assert!(cleared.iter().any(|c| c.starts_with("access_token=;")));
        assert!(cleared.iter().any(|c| c.starts_with("refresh_token=;")));
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn valid_access_token_reaches_handler_with_permissions() {
        let user = User::new("mw@example.com".to_string(), UserTier::General);
        let state = test_state(Some(&user), &["feedback_read"], false);
        let token = state
            .codec
            .sign(user.id(), TokenKind::Access)
            .expect("sign");
        let router = test_router(state);

        let request = Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, format!("access_token={}", token))
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(
            body_text(response).await,
            format!("{}:feedback_read", user.id())
        );
    }

    #[tokio::test]
    async fn refresh_rotation_writes_new_cookies_to_the_response() {
        let user = User::new("rotate@example.com".to_string(), UserTier::General);
        let state = test_state(Some(&user), &[], false);
        let refresh = state
            .codec
            .sign(user.id(), TokenKind::Refresh)
            .expect("sign");
        let router = test_router(state);

        let request = Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, format!("refresh_token={}", refresh))
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let rotated = set_cookies(&response);
        assert!(
            rotated
                .iter()
                .any(|c| c.starts_with("access_token=") && !c.starts_with("access_token=;"))
        );
        assert!(
            rotated
                .iter()
                .any(|c| c.starts_with("refresh_token=") && !c.starts_with("refresh_token=;"))
        );
        assert_eq!(body_text(response).await, format!("{}:", user.id()));
    }

    #[tokio::test]
    async fn handler_token_cookies_win_over_rotation() {
        // A shared browser carries a still-valid refresh token for an old
        // account while the handler signs a new account in. The handler's
        // cookies must be the only token cookies on the response.
        let old_account = User::new("old@example.com".to_string(), UserTier::General);
        let state = test_state(Some(&old_account), &[], false);
        let stale_refresh = state
            .codec
            .sign(old_account.id(), TokenKind::Refresh)
            .expect("sign");
        let router = test_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/signin")
            .header(header::COOKIE, format!("refresh_token={}", stale_refresh))
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let written = set_cookies(&response);
        let access: Vec<&String> = written
            .iter()
            .filter(|c| c.starts_with("access_token="))
            .collect();
        let refresh: Vec<&String> = written
            .iter()
            .filter(|c| c.starts_with("refresh_token="))
            .collect();
        assert_eq!(access.len(), 1);
        assert!(access[0].starts_with("access_token=handler-access"));
        assert_eq!(refresh.len(), 1);
        assert!(refresh[0].starts_with("refresh_token=handler-refresh"));
    }

    #[tokio::test]
    async fn permission_store_failure_fails_the_request() {
        let user = User::new("failing@example.com".to_string(), UserTier::General);
        let state = test_state(Some(&user), &[], true);
        let token = state
            .codec
            .sign(user.id(), TokenKind::Access)
            .expect("sign");
        let router = test_router(state);

        let request = Request::builder()
            .uri("/whoami")
            .header(header::COOKIE, format!("access_token={}", token))
            .body(Body::empty())
            .expect("request");
        let response = router.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
