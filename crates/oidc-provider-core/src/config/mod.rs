//! Tenant and client configuration.
//!
//! [`IssuerConfig`] and [`ClientConfig`] are immutable records looked up
//! through storage on every request. [`Endpoint`] holds the path suffixes
//! advertised in discovery documents. [`ProviderSettings`] loads all three
//! from a TOML file.
//!
//! All durations on these records are whole seconds.

mod settings;

pub use settings::{ClientSettings, IssuerSettings, ProviderSettings};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::{GrantType, PkceCodeChallengeMethod, ResponseType};
use crate::token_generator::constant_time_eq;

/// Default authorization request stash lifetime (10 minutes).
pub const DEFAULT_AUTHORIZATION_REQUEST_DATA_DURATION: i64 = 600;
/// Default authorization code lifetime (10 minutes).
pub const DEFAULT_AUTHORIZATION_CODE_DURATION: i64 = 600;
/// Default access token lifetime (1 hour).
pub const DEFAULT_ACCESS_TOKEN_DURATION: i64 = 3600;
/// Default refresh token lifetime (90 days).
pub const DEFAULT_REFRESH_TOKEN_DURATION: i64 = 90 * 24 * 3600;
/// Default ID token lifetime (1 hour).
pub const DEFAULT_ID_TOKEN_DURATION: i64 = 3600;

// =============================================================================
// Issuer
// =============================================================================

/// Configuration of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Issuer identifier, the tenant's base URL.
    pub issuer: String,

    /// Scopes any client of this issuer may request.
    pub scopes: Vec<String>,

    /// Response types accepted at the authorization endpoint.
    pub supported_response_types: Vec<ResponseType>,

    /// Grant types accepted at the token endpoint.
    pub supported_grant_types: Vec<GrantType>,

    /// PKCE methods accepted in authorization requests.
    pub supported_code_challenge_methods: Vec<PkceCodeChallengeMethod>,

    /// Whether every authorization request must carry a `code_challenge`.
    pub required_pkce: bool,

    /// Lifetime of a stashed authorization request.
    pub authorization_request_data_duration: i64,

    /// Default authorization code lifetime.
    pub authorization_code_duration: i64,

    /// Default access token lifetime.
    pub access_token_duration: i64,

    /// Default refresh token lifetime.
    pub refresh_token_duration: i64,

    /// Default ID token lifetime.
    pub id_token_duration: i64,
}

impl IssuerConfig {
    /// Creates an issuer with the `openid` scope, the code flow, the
    /// `authorization_code` / `refresh_token` / `client_credentials` grants
    /// and default lifetimes.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            scopes: vec!["openid".to_string()],
            supported_response_types: vec![ResponseType::Code],
            supported_grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::ClientCredentials,
            ],
            supported_code_challenge_methods: vec![PkceCodeChallengeMethod::S256],
            required_pkce: false,
            authorization_request_data_duration: DEFAULT_AUTHORIZATION_REQUEST_DATA_DURATION,
            authorization_code_duration: DEFAULT_AUTHORIZATION_CODE_DURATION,
            access_token_duration: DEFAULT_ACCESS_TOKEN_DURATION,
            refresh_token_duration: DEFAULT_REFRESH_TOKEN_DURATION,
            id_token_duration: DEFAULT_ID_TOKEN_DURATION,
        }
    }

    /// Sets the allowed scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the supported response types.
    #[must_use]
    pub fn with_response_types(mut self, response_types: Vec<ResponseType>) -> Self {
        self.supported_response_types = response_types;
        self
    }

    /// Sets the supported grant types.
    #[must_use]
    pub fn with_grant_types(mut self, grant_types: Vec<GrantType>) -> Self {
        self.supported_grant_types = grant_types;
        self
    }

    /// Sets the supported PKCE methods.
    #[must_use]
    pub fn with_code_challenge_methods(mut self, methods: Vec<PkceCodeChallengeMethod>) -> Self {
        self.supported_code_challenge_methods = methods;
        self
    }

    /// Sets whether PKCE is mandatory.
    #[must_use]
    pub fn with_required_pkce(mut self, required: bool) -> Self {
        self.required_pkce = required;
        self
    }

    /// Returns `true` if every scope in `scopes` is allowed by this issuer.
    #[must_use]
    pub fn allows_scopes(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }
}

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 client types (RFC 6749 §2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Can keep a secret; must authenticate at the token endpoint.
    Confidential,
    /// Cannot keep a secret; identified by `client_id` only.
    Public,
}

impl ClientType {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confidential => "confidential",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered client of one issuer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Shared secret.
    pub secret: String,

    /// Client type.
    #[serde(rename = "type")]
    pub client_type: ClientType,

    /// Scopes this client may request.
    pub scopes: Vec<String>,

    /// Grant types this client may use.
    pub supported_grant_types: Vec<GrantType>,

    /// Registered redirect URIs, compared by exact string match.
    pub redirect_uris: Vec<String>,

    /// Per-client override of the stashed request lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_request_data_duration: Option<i64>,

    /// Per-client override of the authorization code lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code_duration: Option<i64>,

    /// Per-client override of the access token lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_duration: Option<i64>,

    /// Per-client override of the refresh token lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_duration: Option<i64>,

    /// Per-client override of the ID token lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_duration: Option<i64>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .field("client_type", &self.client_type)
            .field("scopes", &self.scopes)
            .field("supported_grant_types", &self.supported_grant_types)
            .field("redirect_uris", &self.redirect_uris)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Creates a client without scopes, grants or redirect URIs.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        client_type: ClientType,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            secret: secret.into(),
            client_type,
            scopes: Vec::new(),
            supported_grant_types: Vec::new(),
            redirect_uris: Vec::new(),
            authorization_request_data_duration: None,
            authorization_code_duration: None,
            access_token_duration: None,
            refresh_token_duration: None,
            id_token_duration: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the allowed scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the allowed grant types.
    #[must_use]
    pub fn with_grant_types(mut self, grant_types: Vec<GrantType>) -> Self {
        self.supported_grant_types = grant_types;
        self
    }

    /// Sets the registered redirect URIs.
    #[must_use]
    pub fn with_redirect_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redirect_uris = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the access token lifetime.
    #[must_use]
    pub fn with_access_token_duration(mut self, seconds: i64) -> Self {
        self.access_token_duration = Some(seconds);
        self
    }

    /// Overrides the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_duration(mut self, seconds: i64) -> Self {
        self.refresh_token_duration = Some(seconds);
        self
    }

    /// Returns `true` for confidential clients.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_type == ClientType::Confidential
    }

    /// Returns `true` if `secret` is this client's secret. Public clients
    /// carry no secret and never match.
    #[must_use]
    pub fn verify_secret(&self, secret: &str) -> bool {
        self.is_confidential() && constant_time_eq(&self.secret, secret)
    }

    /// Returns `true` if every scope in `scopes` is allowed for this client.
    #[must_use]
    pub fn allows_scopes(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Returns `true` if `uri` is one of the registered redirect URIs.
    #[must_use]
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    /// Stashed request lifetime for this client under `issuer`.
    #[must_use]
    pub fn authorization_request_data_duration_for(&self, issuer: &IssuerConfig) -> i64 {
        self.authorization_request_data_duration
            .unwrap_or(issuer.authorization_request_data_duration)
    }

    /// Authorization code lifetime for this client under `issuer`.
    #[must_use]
    pub fn authorization_code_duration_for(&self, issuer: &IssuerConfig) -> i64 {
        self.authorization_code_duration
            .unwrap_or(issuer.authorization_code_duration)
    }

    /// Access token lifetime for this client under `issuer`.
    #[must_use]
    pub fn access_token_duration_for(&self, issuer: &IssuerConfig) -> i64 {
        self.access_token_duration
            .unwrap_or(issuer.access_token_duration)
    }

    /// Refresh token lifetime for this client under `issuer`.
    #[must_use]
    pub fn refresh_token_duration_for(&self, issuer: &IssuerConfig) -> i64 {
        self.refresh_token_duration
            .unwrap_or(issuer.refresh_token_duration)
    }

    /// ID token lifetime for this client under `issuer`.
    #[must_use]
    pub fn id_token_duration_for(&self, issuer: &IssuerConfig) -> i64 {
        self.id_token_duration.unwrap_or(issuer.id_token_duration)
    }
}

// =============================================================================
// Endpoint paths
// =============================================================================

/// Endpoint path suffixes, appended to the issuer URL in discovery documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// JWK Set endpoint.
    pub jwks_endpoint: String,
    /// Introspection endpoint.
    pub introspection_endpoint: String,
    /// Revocation endpoint.
    pub revocation_endpoint: String,
    /// Host-side endpoint that mints tokens for tests and tooling.
    pub create_access_token_endpoint: String,
    /// OAuth 2.0 Authorization Server Metadata.
    pub authorization_server_metadata_endpoint: String,
    /// OpenID Provider Configuration.
    pub openid_provider_configuration_endpoint: String,
    /// Host login page.
    pub login_endpoint: String,
    /// Host error page for non-redirectable errors.
    pub error_endpoint: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            authorization_endpoint: "/auth".to_string(),
            token_endpoint: "/token".to_string(),
            jwks_endpoint: "/jwks".to_string(),
            introspection_endpoint: "/introspection".to_string(),
            revocation_endpoint: "/revocation".to_string(),
            create_access_token_endpoint: "/token/new".to_string(),
            authorization_server_metadata_endpoint: "/.well-known/oauth-authorization-server"
                .to_string(),
            openid_provider_configuration_endpoint: "/.well-known/openid-configuration"
                .to_string(),
            login_endpoint: "/login".to_string(),
            error_endpoint: "/error".to_string(),
        }
    }
}
