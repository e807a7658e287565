//! Opaque credentials issued by the engine.
//!
//! Access tokens, refresh tokens and authorization codes are random strings
//! looked up by exact value. Their records carry everything the handlers need
//! to validate them later: owner, subject, scope and absolute expiry.

mod generator;
mod security_token;

pub use generator::{AccessTokenGenerator, AuthorizationCodeGenerator, RefreshTokenGenerator};
pub use security_token::{
    ActorToken, ExchangedToken, SecurityTokenGenerator, SubjectToken, TokenExchangeRequestData,
    UnsupportedSecurityTokenGenerator,
};

use serde::{Deserialize, Serialize};

use crate::metadata::AccessTokenType;
use crate::request::authentication::AuthenticationRequest;
use crate::request::authorization::AuthorizationRequest;

/// Scope that makes the authorization code grant issue a refresh token.
pub const OFFLINE_ACCESS_SCOPE: &str = "offline_access";

// =============================================================================
// Access token
// =============================================================================

/// An issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Issuing tenant.
    pub issuer: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Resource owner, `None` for client credentials tokens.
    pub subject: Option<String>,
    /// Opaque token value.
    pub token: String,
    /// Token type.
    pub token_type: AccessTokenType,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Absolute expiry (epoch seconds).
    pub expires_at: i64,
    /// Issue time (epoch seconds).
    pub issued_at: i64,
    /// Granted scope.
    pub scope: Option<Vec<String>>,
}

impl AccessToken {
    /// Returns `true` once `now` has passed the expiry.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// Granted scope joined with spaces.
    #[must_use]
    pub fn scope_string(&self) -> Option<String> {
        self.scope.as_ref().map(|scope| scope.join(" "))
    }
}

// =============================================================================
// Refresh token
// =============================================================================

/// An issued refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Issuing tenant.
    pub issuer: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// Resource owner.
    pub subject: Option<String>,
    /// Opaque token value.
    pub token: String,
    /// Type of the access tokens it yields.
    pub token_type: AccessTokenType,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Absolute expiry (epoch seconds).
    pub expires_at: i64,
    /// Issue time (epoch seconds).
    pub issued_at: i64,
    /// Scope of the original grant.
    pub scope: Option<Vec<String>>,
}

impl RefreshToken {
    /// Returns `true` once `now` has passed the expiry.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// Granted scope joined with spaces.
    #[must_use]
    pub fn scope_string(&self) -> Option<String> {
        self.scope.as_ref().map(|scope| scope.join(" "))
    }
}

// =============================================================================
// Authorization code
// =============================================================================

/// An issued authorization code together with the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// Issuing tenant.
    pub issuer: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Opaque code value.
    pub code: String,
    /// Absolute expiry (epoch seconds).
    pub expires_at: i64,
    /// Authenticated end user.
    pub subject: String,
    /// Originating authorization request; binds redirect URI and PKCE.
    pub authorization_request: AuthorizationRequest,
    /// Originating authentication request, when `openid` was requested.
    pub authentication_request: Option<AuthenticationRequest>,
}

impl AuthorizationCode {
    /// Returns `true` once `now` has passed the expiry.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}
