//! # oidc-provider-core
//!
//! Embeddable OAuth 2.0 / OpenID Connect authorization server engine.
//!
//! This crate turns HTTP-shaped requests into protocol responses for one or
//! more tenants ("issuers"). It owns no transport, no login UI and no
//! session: the host maps its web framework's requests to [`HttpRequest`],
//! authenticates the end user itself, and renders what the engine returns.
//!
//! It provides:
//! - Authorization code, implicit and hybrid flows with PKCE
//! - OpenID Connect ID tokens signed with RSA or EC keys
//! - Client credentials, refresh token and token exchange grants
//! - Token introspection and revocation
//! - OAuth 2.0 and OpenID Connect discovery documents and the JWK Set
//!
//! ## Modules
//!
//! - [`provider`] - Engine entry point, one method per endpoint
//! - [`handler`] - Endpoint handlers
//! - [`request`] - Request parsing, responses and per-endpoint error families
//! - [`config`] - Issuer and client configuration, TOML settings
//! - [`storage`] - Persistence traits and the in-memory implementation
//! - [`client_auth`] - Client authentication methods
//! - [`authorization`] - Codes, access tokens and refresh tokens
//! - [`authentication`] - ID tokens and user claims
//! - [`jwk`] - Signing keys and the JWK Set
//! - [`metadata`] - Protocol enumerations and discovery documents

pub mod authentication;
pub mod authorization;
pub mod client_auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod jwk;
pub mod metadata;
pub mod provider;
pub mod request;
pub mod storage;
pub mod token_generator;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ClientConfig, ClientType, Endpoint, IssuerConfig, ProviderSettings};
pub use error::ProviderError;
pub use http::HttpRequest;
pub use jwk::{Jwk, JwkConfig, Jwks, SigningKeyPair};
pub use provider::{Provider, ProviderConfig};
pub use storage::memory::MemoryStorage;
pub use token_generator::{SecureTokenGenerator, TokenGenerator};

/// Type alias for engine-level results.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oidc_provider_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ProviderResult;
    pub use crate::authentication::{StandardClaim, UserClaimSet};
    pub use crate::authorization::{SecurityTokenGenerator, TokenExchangeRequestData};
    pub use crate::config::{ClientConfig, ClientType, Endpoint, IssuerConfig, ProviderSettings};
    pub use crate::error::ProviderError;
    pub use crate::http::HttpRequest;
    pub use crate::jwk::{JwkConfig, Jwks, SigningKeyPair};
    pub use crate::metadata::{
        GrantType, PkceCodeChallengeMethod, ResponseMode, ResponseType, TokenType,
    };
    pub use crate::provider::{Provider, ProviderConfig};
    pub use crate::request::authorization::{
        AuthorizationRequestData, AuthorizationRequestError, AuthorizationResponse,
        AuthorizationResponseError,
    };
    pub use crate::request::introspection::{IntrospectionRequestError, IntrospectionResponse};
    pub use crate::request::revocation::RevocationRequestError;
    pub use crate::request::token::{TokenRequestError, TokenResponse};
    pub use crate::storage::memory::MemoryStorage;
}
