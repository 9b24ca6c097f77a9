//! Signed access/refresh token encoding and verification.
//!
//! Tokens are compact HS256-signed strings carrying the subject user ID, the
//! issue time, the expiry, and the token kind. Verification is purely
//! computational: signature plus expiry against a process-wide secret, with
//! no network or disk I/O. The kind claim is checked after the signature so
//! a validly signed refresh token can never be accepted where an access
//! token is required.

use chrono::{DateTime, TimeZone, Utc};
use clamor_core::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// The two kinds of signed token the platform issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential proving identity for a single request window.
    Access,
    /// Long-lived credential used solely to mint a new access token.
    Refresh,
}

impl TokenKind {
    /// Returns the kind as a lowercase string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user ID in prefixed display form.
    pub sub: String,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
    /// Which kind of token this is.
    pub kind: TokenKind,
}

impl TokenClaims {
    /// Parses the subject claim as a user ID.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError::Malformed`] if the subject is not a valid
    /// user ID.
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub.parse().map_err(|e| TokenError::Malformed {
            reason: format!("subject is not a user id: {}", e),
        })
    }

    /// Returns the issue time.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    /// Returns the expiry time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// Token signing configuration.
///
/// The secret is process-wide, read-only, and injected once at startup.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret used to sign and verify all tokens.
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(), // must be provided by configuration
            access_ttl_secs: 3600,
            refresh_ttl_secs: 86400 * 14,
        }
    }
}

/// Signs and verifies access/refresh tokens.
///
/// Cheap to clone; safe to share across request handlers since it holds only
/// immutable key material.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenCodec {
    /// Creates a codec from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingSecret`] if no secret is configured.
    /// This is fatal at startup and must not be silently ignored.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        if config.secret.len() < 32 {
            tracing::warn!("token signing secret is shorter than the recommended 32 bytes");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token whose exp is in the past always fails.
        validation.leeway = 0;
        validation.validate_aud = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        })
    }

    /// Returns the configured lifetime for the given token kind, in seconds.
    #[must_use]
    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }

    /// Signs a new token of the given kind for the given subject.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError::Malformed`] if the claims cannot be encoded.
    pub fn sign(&self, subject: UserId, kind: TokenKind) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.ttl_secs(kind),
            kind,
        };
        self.sign_claims(&claims)
    }

    /// Signs an explicit set of claims.
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            TokenError::Malformed {
                reason: e.to_string(),
            }
        })
    }

    /// Verifies a token and checks that it is of the expected kind.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidSignature`] if the signature does not match
    /// - [`TokenError::Expired`] if the expiry is in the past
    /// - [`TokenError::WrongKind`] if the token is validly signed but of the
    ///   other kind
    /// - [`TokenError::Malformed`] for anything undecodable
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed {
                    reason: e.to_string(),
                },
            },
        )?;

        if data.claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: data.claims.kind,
            });
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> TokenCodec {
        TokenCodec::new(&TokenConfig {
            secret: "test-secret-that-is-long-enough-to-use".to_string(),
            ..TokenConfig::default()
        })
        .expect("codec")
    }

    #[test]
    fn missing_secret_is_rejected_at_construction() {
        let result = TokenCodec::new(&TokenConfig::default());
        assert_eq!(result.unwrap_err(), TokenError::MissingSecret);
    }

    #[test]
    fn sign_verify_roundtrip_preserves_subject() {
        let codec = test_codec();
        let user_id = UserId::new();

        let token = codec.sign(user_id, TokenKind::Access).expect("sign");
        let claims = codec.verify(&token, TokenKind::Access).expect("verify");

        assert_eq!(claims.user_id().expect("subject"), user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_fails_regardless_of_signature() {
        let codec = test_codec();
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: UserId::new().to_string(),
            iat: now - 7200,
            exp: now - 3600,
            kind: TokenKind::Access,
        };

        let token = codec.sign_claims(&claims).expect("sign");
        let result = codec.verify(&token, TokenKind::Access);
        assert_eq!(result.unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn refresh_token_rejected_as_access() {
        let codec = test_codec();
        let token = codec.sign(UserId::new(), TokenKind::Refresh).expect("sign");

        let result = codec.verify(&token, TokenKind::Access);
        assert_eq!(
            result.unwrap_err(),
            TokenError::WrongKind {
                expected: TokenKind::Access,
                found: TokenKind::Refresh,
            }
        );
    }

    #[test]
    fn access_token_rejected_as_refresh() {
        let codec = test_codec();
        let token = codec.sign(UserId::new(), TokenKind::Access).expect("sign");

        let result = codec.verify(&token, TokenKind::Refresh);
        assert_eq!(
            result.unwrap_err(),
            TokenError::WrongKind {
                expected: TokenKind::Refresh,
                found: TokenKind::Access,
            }
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let codec1 = test_codec();
        let codec2 = TokenCodec::new(&TokenConfig {
            secret: "a-completely-different-signing-secret!".to_string(),
            ..TokenConfig::default()
        })
        .expect("codec");

        let token = codec1.sign(UserId::new(), TokenKind::Access).expect("sign");
        let result = codec2.verify(&token, TokenKind::Access);
        assert_eq!(result.unwrap_err(), TokenError::InvalidSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = test_codec();
        let result = codec.verify("not.a.token", TokenKind::Access);
        assert!(matches!(result, Err(TokenError::Malformed { .. })));
    }

    #[test]
    fn claims_with_unparseable_subject_have_no_user_id() {
        let claims = TokenClaims {
            sub: "definitely-not-a-ulid".to_string(),
            iat: 0,
            exp: 0,
            kind: TokenKind::Access,
        };
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn ttl_follows_kind() {
        let codec = test_codec();
        assert_eq!(codec.ttl_secs(TokenKind::Access), 3600);
        assert_eq!(codec.ttl_secs(TokenKind::Refresh), 86400 * 14);
    }
}
