//! Authorization endpoint requests (RFC 6749 §4.1.1, §4.2.1).

mod converter;
mod response;

pub use converter::AuthorizationRequestConverter;
pub use response::{
    AuthorizationResponse, AuthorizationResponseCode, AuthorizationResponseError,
    AuthorizationResponseIdToken, AuthorizationResponseToken,
};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::metadata::{PkceCodeChallengeMethod, ResponseMode, ResponseType};
use crate::request::authentication::{AuthenticationErrorCode, AuthenticationRequest};

// =============================================================================
// Request
// =============================================================================

/// A validated authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Requested response types, in request order.
    pub response_type: Vec<ResponseType>,
    /// Requesting client.
    pub client_id: String,
    /// Registered redirect URI the response is sent to.
    pub redirect_uri: String,
    /// Requested scopes, `None` when the parameter was absent.
    pub scope: Option<Vec<String>>,
    /// Opaque client state echoed back in the response.
    pub state: Option<String>,
    /// Requested response mode.
    pub response_mode: Option<ResponseMode>,
    /// PKCE challenge.
    pub code_challenge: Option<String>,
    /// PKCE challenge method, `None` meaning `plain`.
    pub code_challenge_method: Option<PkceCodeChallengeMethod>,
}

impl AuthorizationRequest {
    /// Returns `true` if `scope` was requested.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_ref()
            .is_some_and(|scopes| scopes.iter().any(|s| s == scope))
    }

    /// Returns `true` if `response_type` was requested.
    #[must_use]
    pub fn requests(&self, response_type: ResponseType) -> bool {
        self.response_type.contains(&response_type)
    }
}

/// An authorization request stashed between the pre- and post-process steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequestData {
    /// Owning issuer.
    pub issuer: String,
    /// Opaque lookup key handed to the login/consent UI.
    pub key: String,
    /// Absolute expiry (epoch seconds).
    pub expires_at: i64,
    /// The OAuth 2.0 part of the request.
    pub authorization_request: AuthorizationRequest,
    /// The OpenID Connect part, present when `openid` was requested.
    pub authentication_request: Option<AuthenticationRequest>,
}

impl AuthorizationRequestData {
    /// Returns `true` once `now` has passed the expiry.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

// =============================================================================
// Error codes
// =============================================================================

/// Authorization error codes (RFC 6749 §4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// Malformed or missing parameter.
    InvalidRequest,
    /// Client may not use this response type.
    UnauthorizedClient,
    /// Resource owner denied the request.
    AccessDenied,
    /// Response type not supported.
    UnsupportedResponseType,
    /// Scope invalid or unknown.
    InvalidScope,
    /// Unexpected server condition.
    ServerError,
    /// Server temporarily unable to handle the request.
    TemporaryUnavailable,
}

impl AuthorizationErrorCode {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporaryUnavailable => "temporary_unavailable",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failures of the authorization endpoint's pre-process step.
///
/// `InvalidClient` and `InvalidRedirectUri` have no trustworthy redirect
/// target and must be rendered as an error page. The response variants carry
/// everything needed to redirect the user agent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationRequestError {
    /// The client is missing or unknown.
    #[error("Invalid client: {description}")]
    InvalidClient {
        /// Description of the failure.
        description: String,
    },

    /// The redirect URI is missing, duplicated or not registered.
    #[error("Invalid redirect URI: {description}")]
    InvalidRedirectUri {
        /// Description of the failure.
        description: String,
    },

    /// OAuth 2.0 error to be redirected to the client.
    #[error("{error}: {}", .error_description.as_deref().unwrap_or_default())]
    ErrorResponse {
        /// Redirect target.
        redirect_uri: String,
        /// Error code.
        error: AuthorizationErrorCode,
        /// Human-readable description.
        error_description: Option<String>,
        /// URI of a page describing the error.
        error_uri: Option<String>,
        /// Client state.
        state: Option<String>,
    },

    /// OpenID Connect error to be redirected to the client.
    #[error("{error}: {}", .error_description.as_deref().unwrap_or_default())]
    AuthenticationErrorResponse {
        /// Redirect target.
        redirect_uri: String,
        /// Error code.
        error: AuthenticationErrorCode,
        /// Human-readable description.
        error_description: Option<String>,
        /// URI of a page describing the error.
        error_uri: Option<String>,
        /// Client state.
        state: Option<String>,
    },

    /// Engine-level failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AuthorizationRequestError {
    /// Creates an `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::InvalidClient {
            description: description.into(),
        }
    }

    /// Creates an `InvalidRedirectUri` error.
    #[must_use]
    pub fn invalid_redirect_uri(description: impl Into<String>) -> Self {
        Self::InvalidRedirectUri {
            description: description.into(),
        }
    }

    /// Creates a redirectable OAuth 2.0 error.
    #[must_use]
    pub fn error_response(
        redirect_uri: impl Into<String>,
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self::ErrorResponse {
            redirect_uri: redirect_uri.into(),
            error,
            error_description: Some(description.into()),
            error_uri: None,
            state,
        }
    }

    /// Creates a redirectable OpenID Connect error.
    #[must_use]
    pub fn authentication_error_response(
        redirect_uri: impl Into<String>,
        error: AuthenticationErrorCode,
        description: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self::AuthenticationErrorResponse {
            redirect_uri: redirect_uri.into(),
            error,
            error_description: Some(description.into()),
            error_uri: None,
            state,
        }
    }

    /// Returns the redirect target, if the error may be sent to the client.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        match self {
            Self::ErrorResponse { redirect_uri, .. }
            | Self::AuthenticationErrorResponse { redirect_uri, .. } => Some(redirect_uri),
            _ => None,
        }
    }

    /// Returns the wire error code for redirectable errors.
    #[must_use]
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ErrorResponse { error, .. } => Some(error.as_str()),
            Self::AuthenticationErrorResponse { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if the error can be redirected to the client.
    #[must_use]
    pub fn is_redirectable(&self) -> bool {
        self.redirect_uri().is_some()
    }

    /// Query/fragment parameters for a redirectable error.
    #[must_use]
    pub fn redirect_parameters(&self) -> Vec<(&'static str, String)> {
        let (error, description, uri, state) = match self {
            Self::ErrorResponse {
                error,
                error_description,
                error_uri,
                state,
                ..
            } => (error.as_str(), error_description, error_uri, state),
            Self::AuthenticationErrorResponse {
                error,
                error_description,
                error_uri,
                state,
                ..
            } => (error.as_str(), error_description, error_uri, state),
            _ => return Vec::new(),
        };

        let mut parameters = vec![("error", error.to_string())];
        if let Some(description) = description {
            parameters.push(("error_description", description.clone()));
        }
        if let Some(uri) = uri {
            parameters.push(("error_uri", uri.clone()));
        }
        if let Some(state) = state {
            parameters.push(("state", state.clone()));
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_values() {
        assert_eq!(AuthorizationErrorCode::AccessDenied.as_str(), "access_denied");
        assert_eq!(
            serde_json::to_value(AuthorizationErrorCode::UnsupportedResponseType).unwrap(),
            "unsupported_response_type"
        );
    }

    #[test]
    fn test_non_redirectable_errors() {
        let error = AuthorizationRequestError::invalid_client("Client does not exist.");
        assert!(!error.is_redirectable());
        assert!(error.redirect_parameters().is_empty());
        assert!(error.error_code().is_none());
    }

    #[test]
    fn test_redirect_parameters_carry_state() {
        let error = AuthorizationRequestError::error_response(
            "http://localhost/cb",
            AuthorizationErrorCode::InvalidRequest,
            "'state' is duplicated.",
            Some("xyz".to_string()),
        );

        assert_eq!(error.redirect_uri(), Some("http://localhost/cb"));
        assert_eq!(
            error.redirect_parameters(),
            vec![
                ("error", "invalid_request".to_string()),
                ("error_description", "'state' is duplicated.".to_string()),
                ("state", "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn test_request_helpers() {
        let request = AuthorizationRequest {
            response_type: vec![ResponseType::Code],
            client_id: "foo".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            scope: Some(vec!["openid".to_string()]),
            state: None,
            response_mode: None,
            code_challenge: None,
            code_challenge_method: None,
        };

        assert!(request.has_scope("openid"));
        assert!(!request.has_scope("offline_access"));
        assert!(request.requests(ResponseType::Code));
        assert!(!request.requests(ResponseType::Token));
    }
}
