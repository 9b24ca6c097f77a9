//! Error types for the access crate.
//!
//! Token verification failures (`TokenError`) are expected conditions: the
//! session state machine degrades them to an anonymous request instead of
//! propagating them. Lookup failures (`StoreError`) are not masked — an
//! unreachable store is distinguished from a legitimately empty result and
//! always surfaces to the caller.

use crate::token::TokenKind;
use std::fmt;

/// Errors from signing or verifying tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No signing secret is configured. Fatal at startup.
    MissingSecret,
    /// The token's signature does not match the configured secret.
    InvalidSignature,
    /// The token's expiry is in the past.
    Expired,
    /// The token is validly signed but is the wrong kind for this check.
    /// Rejecting these prevents a refresh token from standing in for an
    /// access token, and vice versa.
    WrongKind { expected: TokenKind, found: TokenKind },
    /// The token could not be decoded at all.
    Malformed { reason: String },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret => write!(f, "no token signing secret is configured"),
            Self::InvalidSignature => write!(f, "token signature is invalid"),
            Self::Expired => write!(f, "token has expired"),
            Self::WrongKind { expected, found } => {
                write!(f, "expected a {} token, found a {} token", expected, found)
            }
            Self::Malformed { reason } => write!(f, "malformed token: {}", reason),
        }
    }
}

impl std::error::Error for TokenError {}

/// Error from a lookup collaborator (user, role binding, or permission store).
///
/// Carries only a description of the underlying failure; callers treat any
/// store error as a failed request rather than an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    details: String,
}

impl StoreError {
    /// Creates a store error from the underlying failure.
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lookup store error: {}", self.details)
    }
}

impl std::error::Error for StoreError {}

/// Errors from resolving a request's session.
///
/// Both variants abort the request: a store failure must not silently
/// degrade to anonymous, and a signing failure during rotation indicates a
/// configuration problem.
#[derive(Debug)]
pub enum SessionError {
    /// A lookup collaborator failed.
    Store(StoreError),
    /// Minting a replacement token pair failed.
    Signing(TokenError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "session resolution failed: {}", e),
            Self::Signing(e) => write!(f, "token rotation failed: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::Signing(e) => Some(e),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
