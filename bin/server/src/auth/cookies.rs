//! Cookie adapter for the access/refresh token pair.
//!
//! Reads the token pair from the request and applies the session manager's
//! cookie mutations to the response jar. The access token may also arrive in
//! an `Authorization: Bearer` header (public collection API clients); the
//! refresh token is cookie-only. Clearing a cookie writes an empty value
//! with a zero max-age, scoped to the same configured domain as the write.

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use clamor_access::{CookieMutation, RequestTokens, TokenKind};
use time::Duration;

use crate::config::AuthConfig;

/// Extracts the token pair presented by a request.
#[must_use]
pub fn extract_tokens(jar: &CookieJar, headers: &HeaderMap, config: &AuthConfig) -> RequestTokens {
    let access = jar
        .get(&config.access_cookie)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(headers));
    let refresh = jar
        .get(&config.refresh_cookie)
        .map(|c| c.value().to_string());

    RequestTokens { access, refresh }
}

/// Applies the session manager's cookie mutations to the response jar.
#[must_use]
pub fn apply_mutations(
    jar: CookieJar,
    mutations: &[CookieMutation],
    config: &AuthConfig,
) -> CookieJar {
    mutations.iter().fold(jar, |jar, mutation| match mutation {
        CookieMutation::Set {
            kind,
            value,
            max_age_secs,
        } => jar.add(build_cookie(
            config,
            *kind,
            value.clone(),
            Duration::seconds(*max_age_secs),
        )),
        CookieMutation::Clear { kind } => {
            jar.add(build_cookie(config, *kind, String::new(), Duration::ZERO))
        }
    })
}

/// Returns true if the response already sets one of the token cookies.
///
/// A handler that wrote the token cookies itself (sign-in) owns the session
/// for that response; any rotation the session manager produced for the
/// stale inbound tokens must not override it.
#[must_use]
pub fn sets_token_cookie(headers: &HeaderMap, config: &AuthConfig) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split('=').next())
        .any(|name| name == config.access_cookie || name == config.refresh_cookie)
}

/// Returns the configured cookie name for the given token kind.
#[must_use]
pub fn cookie_name(config: &AuthConfig, kind: TokenKind) -> &str {
    match kind {
        TokenKind::Access => &config.access_cookie,
        TokenKind::Refresh => &config.refresh_cookie,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn build_cookie(
    config: &AuthConfig,
    kind: TokenKind,
    value: String,
    max_age: Duration,
) -> Cookie<'static> {
    let mut builder = Cookie::build((cookie_name(config, kind).to_string(), value))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(max_age);

    if let Some(domain) = &config.cookie_domain {
        builder = builder.domain(domain.clone());
    }

    builder.build()
}
