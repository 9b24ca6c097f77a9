//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.

use clamor_access::TokenConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Authentication configuration.
    pub auth: AuthConfig,
}

/// Authentication and cookie configuration.
///
/// The signing secret is read once at startup and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access and refresh tokens. Required; startup
    /// fails if it is missing.
    pub secret: String,

    /// Name of the access token cookie.
    #[serde(default = "default_access_cookie")]
    pub access_cookie: String,

    /// Name of the refresh token cookie.
    #[serde(default = "default_refresh_cookie")]
    pub refresh_cookie: String,

    /// Domain the token cookies are scoped to. When unset, cookies are
    /// host-only.
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP
    /// development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:4000".to_string()
}

fn default_access_cookie() -> String {
    "access_token".to_string()
}

fn default_refresh_cookie() -> String {
    "refresh_token".to_string()
}

fn default_access_ttl_secs() -> i64 {
    3600
}

fn default_refresh_ttl_secs() -> i64 {
    86400 * 14
}

fn default_secure_cookies() -> bool {
    true
}

impl AuthConfig {
    /// Builds the token codec configuration from this config.
    #[must_use]
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.secret.clone(),
            access_ttl_secs: self.access_ttl_secs,
            refresh_ttl_secs: self.refresh_ttl_secs,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
