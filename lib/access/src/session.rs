//! Per-request session resolution and refresh-token rotation.
//!
//! Each request is resolved independently: the pair of tokens presented via
//! cookies (or a bearer header for the access token) is reconstructed into an
//! identity, with no cross-request memory. Resolution walks a fixed sequence
//! of states:
//!
//! 1. Neither token present: anonymous, nothing to do.
//! 2. Access token verifies: identity taken from its subject, no mutation.
//! 3. Access absent/invalid and no refresh token: clear the stale access
//!    cookie, anonymous.
//! 4. Refresh token verifies: look up the user (fail closed if gone), mint a
//!    fresh access/refresh pair, and rotate both cookies.
//! 5. Refresh token invalid: clear it, anonymous.
//!
//! Token failures never escape this module; they degrade to anonymous so
//! public routes stay reachable. Store failures do escape — an unreachable
//! user store must fail the request rather than misreport it as anonymous.
//!
//! Rotation here is best-effort: verification is purely signature plus
//! expiry, so an already-issued refresh token stays usable until its natural
//! expiry even after the cookie is overwritten. A server-side revocation
//! store would be required to close that window.

use crate::error::SessionError;
use crate::store::UserStore;
use crate::token::{TokenCodec, TokenKind};
use crate::user::User;

/// The tokens presented by one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTokens {
    /// Access token from its cookie or an `Authorization: Bearer` header.
    pub access: Option<String>,
    /// Refresh token, carried in its cookie only.
    pub refresh: Option<String>,
}

impl RequestTokens {
    /// Returns true if the request presented no tokens at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }
}

/// A cookie change the caller must apply to the response.
///
/// Mutations are collected here and applied once to the response headers, so
/// a request aborted mid-pipeline never observes a partial cookie write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieMutation {
    /// Write a token cookie with the given value and lifetime.
    Set {
        kind: TokenKind,
        value: String,
        max_age_secs: i64,
    },
    /// Clear a token cookie (empty value, zero max-age).
    Clear { kind: TokenKind },
}

/// The result of resolving one request's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// The resolved user, or `None` for an anonymous request.
    pub user: Option<User>,
    /// Cookie changes to apply to the response. Empty whenever the access
    /// token was valid as presented.
    pub mutations: Vec<CookieMutation>,
}

impl SessionOutcome {
    fn anonymous(mutations: Vec<CookieMutation>) -> Self {
        Self {
            user: None,
            mutations,
        }
    }
}

/// Orchestrates token verification, refresh rotation, and cookie mutation
/// for a single request.
#[derive(Debug)]
pub struct SessionManager<'a, U: UserStore + ?Sized> {
    codec: &'a TokenCodec,
    users: &'a U,
}

impl<'a, U: UserStore + ?Sized> SessionManager<'a, U> {
    /// Creates a session manager over the given codec and user store.
    #[must_use]
    pub fn new(codec: &'a TokenCodec, users: &'a U) -> Self {
        Self { codec, users }
    }

    /// Resolves the request's identity, returning the user (if any) and the
    /// cookie mutations the response must carry.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the user store fails or a replacement
    /// token pair cannot be minted. Token verification failures are not
    /// errors; they resolve to an anonymous outcome.
    pub async fn resolve(&self, tokens: &RequestTokens) -> Result<SessionOutcome, SessionError> {
        // State 1: nothing presented.
        if tokens.is_empty() {
            return Ok(SessionOutcome::anonymous(Vec::new()));
        }

        // State 2: the access token stands on its own.
        if let Some(access) = tokens.access.as_deref() {
            match self
                .codec
                .verify(access, TokenKind::Access)
                .and_then(|claims| claims.user_id())
            {
                Ok(user_id) => {
                    return match self.users.find_by_id(user_id).await? {
                        Some(user) => Ok(SessionOutcome {
                            user: Some(user),
                            mutations: Vec::new(),
                        }),
                        // The subject vanished after issuance. The token dies
                        // at its natural expiry; no mutation.
                        None => {
                            tracing::debug!(%user_id, "valid access token for unknown user");
                            Ok(SessionOutcome::anonymous(Vec::new()))
                        }
                    };
                }
                Err(e) => {
                    tracing::trace!(error = %e, "access token rejected, trying refresh");
                }
            }
        }

        // A stale access cookie gets cleared on every degraded path below.
        let clear_stale_access = || {
            tokens
                .access
                .iter()
                .map(|_| CookieMutation::Clear {
                    kind: TokenKind::Access,
                })
                .collect::<Vec<_>>()
        };

        // State 3: nothing to rotate with.
        let Some(refresh) = tokens.refresh.as_deref() else {
            return Ok(SessionOutcome::anonymous(clear_stale_access()));
        };

        match self
            .codec
            .verify(refresh, TokenKind::Refresh)
            .and_then(|claims| claims.user_id())
        {
            // State 4: rotate.
            Ok(user_id) => match self.users.find_by_id(user_id).await? {
                Some(user) => {
                    let outcome = self.rotate(user)?;
                    tracing::debug!(user_id = %user_id, "rotated token pair");
                    Ok(outcome)
                }
                None => {
                    // 4a: fail closed. The refresh token names a user that no
                    // longer exists.
                    tracing::debug!(%user_id, "refresh token for unknown user");
                    let mut mutations = clear_stale_access();
                    mutations.push(CookieMutation::Clear {
                        kind: TokenKind::Refresh,
                    });
                    Ok(SessionOutcome::anonymous(mutations))
                }
            },
            // State 5: refresh invalid. Degrade silently.
            Err(e) => {
                tracing::trace!(error = %e, "refresh token rejected");
                let mut mutations = clear_stale_access();
                mutations.push(CookieMutation::Clear {
                    kind: TokenKind::Refresh,
                });
                Ok(SessionOutcome::anonymous(mutations))
            }
        }
    }

    /// Mints a fresh access/refresh pair for the user.
    fn rotate(&self, user: User) -> Result<SessionOutcome, SessionError> {
        let mutations = vec![
            self.mint(&user, TokenKind::Access)?,
            self.mint(&user, TokenKind::Refresh)?,
        ];
        Ok(SessionOutcome {
            user: Some(user),
            mutations,
        })
    }

    fn mint(&self, user: &User, kind: TokenKind) -> Result<CookieMutation, SessionError> {
        let value = self
            .codec
            .sign(user.id(), kind)
            .map_err(SessionError::Signing)?;
        Ok(CookieMutation::Set {
            kind,
            value,
            max_age_secs: self.codec.ttl_secs(kind),
        })
    }
}
