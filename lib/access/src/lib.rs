//! Authentication and permission resolution for the clamor feedback platform.
//!
//! This crate provides:
//! - Signed access/refresh token handling (`TokenCodec`, `TokenClaims`)
//! - The per-request session state machine (`SessionManager`), including
//!   refresh-token rotation and defensive cookie cleanup
//! - Permission resolution from user/role bindings (`PermissionResolver`)
//! - The typed per-request context (`AuthContext`) consumed by handlers
//!
//! # Access Control Model
//!
//! Identity is carried by a short-lived access token and a long-lived refresh
//! token, both signed with a process-wide secret. Neither token is stored
//! server-side: verification is signature plus expiry. When the access token
//! has expired but the refresh token is still valid, a fresh pair is minted
//! and the cookies are rotated without forcing re-login.
//!
//! Permissions are opaque capability strings attached to roles. A request's
//! effective permission set is the union of the permissions of every role
//! bound to the authenticated user, recomputed on each request from the
//! lookup collaborators. An anonymous request always carries the empty set.
//!
//! # Example
//!
//! ```
//! use clamor_access::{TokenCodec, TokenConfig, TokenKind};
//! use clamor_core::UserId;
//!
//! let codec = TokenCodec::new(&TokenConfig {
//!     secret: "an-adequately-long-signing-secret".to_string(),
//!     ..TokenConfig::default()
//! })
//! .expect("secret is configured");
//!
//! let user_id = UserId::new();
//! let token = codec.sign(user_id, TokenKind::Access).expect("sign");
//! let claims = codec.verify(&token, TokenKind::Access).expect("verify");
//! assert_eq!(claims.user_id().expect("subject"), user_id);
//! ```

pub mod context;
pub mod error;
pub mod resolver;
pub mod role;
pub mod session;
pub mod store;
pub mod token;
pub mod user;

// Re-export main types at crate root
pub use context::AuthContext;
pub use error::{SessionError, StoreError, TokenError};
pub use resolver::PermissionResolver;
pub use role::{Permission, PermissionSet, Role};
pub use session::{CookieMutation, RequestTokens, SessionManager, SessionOutcome};
pub use store::{PermissionStore, RoleBindingStore, UserStore};
pub use token::{TokenClaims, TokenCodec, TokenConfig, TokenKind};
pub use user::{User, UserTier};
