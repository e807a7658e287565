//! Token introspection requests (RFC 7662).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::HttpRequest;
use crate::metadata::{AccessTokenType, TokenTypeHint};
use crate::request::{ErrorBody, parse_token_parameters};

/// A validated introspection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    pub token: String,
    /// Which store to search first.
    pub token_type_hint: Option<TokenTypeHint>,
}

impl IntrospectionRequest {
    /// Parses the form body of `request`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for a missing or duplicated `token` and for
    /// an unknown `token_type_hint`.
    pub fn parse(request: &HttpRequest) -> Result<Self, IntrospectionRequestError> {
        let (token, token_type_hint) =
            parse_token_parameters(&request.form_parameters, |description| {
                IntrospectionRequestError::new(IntrospectionErrorCode::InvalidRequest, description)
            })?;

        Ok(Self {
            token,
            token_type_hint,
        })
    }
}

/// Introspection response (RFC 7662 §2.2).
///
/// Inactive tokens carry nothing but `active: false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,

    /// Space-delimited scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Human-readable resource owner identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Token type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<AccessTokenType>,

    /// Expiry (epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issue time (epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before time (epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Resource owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Intended audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Token identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl IntrospectionResponse {
    /// Response for an unknown, expired or revoked token.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Introspection endpoint error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrospectionErrorCode {
    /// Malformed or missing parameter.
    InvalidRequest,
    /// Client authentication failed or was missing.
    InvalidClient,
}

impl IntrospectionErrorCode {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
        }
    }

    /// HTTP status the error is returned with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::InvalidClient => 401,
        }
    }
}

impl fmt::Display for IntrospectionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failures of the introspection endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntrospectionRequestError {
    /// Protocol error returned to the client as JSON.
    #[error("{error}: {}", .error_description.as_deref().unwrap_or_default())]
    ErrorResponse {
        /// Error code.
        error: IntrospectionErrorCode,
        /// Human-readable description.
        error_description: Option<String>,
        /// URI of a page describing the error.
        error_uri: Option<String>,
    },

    /// Engine-level failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IntrospectionRequestError {
    /// Creates a protocol error with a description.
    #[must_use]
    pub fn new(error: IntrospectionErrorCode, description: impl Into<String>) -> Self {
        Self::ErrorResponse {
            error,
            error_description: Some(description.into()),
            error_uri: None,
        }
    }

    /// Returns the protocol error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<IntrospectionErrorCode> {
        match self {
            Self::ErrorResponse { error, .. } => Some(*error),
            Self::Provider(_) => None,
        }
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::ErrorResponse {
                error_description, ..
            } => error_description.as_deref(),
            Self::Provider(_) => None,
        }
    }

    /// HTTP status to answer with; 500 for engine-level failures.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code().map_or(500, |code| code.http_status())
    }

    /// JSON body for protocol errors.
    #[must_use]
    pub fn to_body(&self) -> Option<ErrorBody> {
        match self {
            Self::ErrorResponse {
                error,
                error_description,
                error_uri,
            } => Some(ErrorBody::new(
                error.as_str(),
                error_description.clone(),
                error_uri.clone(),
            )),
            Self::Provider(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let request = HttpRequest::post()
            .with_form("token", "at1")
            .with_form("token_type_hint", "refresh_token");

        let parsed = IntrospectionRequest::parse(&request).unwrap();
        assert_eq!(parsed.token, "at1");
        assert_eq!(parsed.token_type_hint, Some(TokenTypeHint::RefreshToken));
    }

    #[test]
    fn test_token_required() {
        let error = IntrospectionRequest::parse(&HttpRequest::post()).unwrap_err();
        assert_eq!(error.code(), Some(IntrospectionErrorCode::InvalidRequest));
        assert_eq!(error.description(), Some("'token' is required."));
    }

    #[test]
    fn test_unknown_hint() {
        let request = HttpRequest::post()
            .with_form("token", "at1")
            .with_form("token_type_hint", "id_token");

        let error = IntrospectionRequest::parse(&request).unwrap_err();
        assert_eq!(error.description(), Some("'token_type_hint' value is unknown."));
    }

    #[test]
    fn test_inactive_response_has_no_other_fields() {
        let json = serde_json::to_value(IntrospectionResponse::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({ "active": false }));
    }
}
