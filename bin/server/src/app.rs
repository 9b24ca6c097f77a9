//! Router assembly.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};

/// Builds the application router with the authentication middleware stack.
///
/// Layer ordering matters: `authenticate` must complete (including any
/// refresh rotation) before `resolve_permissions` runs, since permission
/// resolution depends on the resolved identity. Layers added later wrap the
/// ones added earlier, so `authenticate` is added last.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/signin", post(auth::sign_in))
        .route(auth::LOGOUT_PATH, post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/admin/roles", get(auth::list_roles))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::resolve_permissions,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
