//! Token revocation requests (RFC 7009).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::HttpRequest;
use crate::metadata::TokenTypeHint;
use crate::request::{ErrorBody, parse_token_parameters};

/// A validated revocation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke.
    pub token: String,
    /// Which store to search first.
    pub token_type_hint: Option<TokenTypeHint>,
}

impl RevocationRequest {
    /// Parses the form body of `request`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for a missing or duplicated `token` and for
    /// an unknown `token_type_hint`.
    pub fn parse(request: &HttpRequest) -> Result<Self, RevocationRequestError> {
        let (token, token_type_hint) =
            parse_token_parameters(&request.form_parameters, |description| {
                RevocationRequestError::new(RevocationErrorCode::InvalidRequest, description)
            })?;

        Ok(Self {
            token,
            token_type_hint,
        })
    }
}

/// Revocation endpoint error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationErrorCode {
    /// Malformed or missing parameter.
    InvalidRequest,
    /// Client authentication failed or was missing.
    InvalidClient,
    /// Token does not belong to the requesting client.
    InvalidGrant,
}

impl RevocationErrorCode {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
        }
    }

    /// HTTP status the error is returned with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            _ => 400,
        }
    }
}

impl fmt::Display for RevocationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failures of the revocation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevocationRequestError {
    /// Protocol error returned to the client as JSON.
    #[error("{error}: {}", .error_description.as_deref().unwrap_or_default())]
    ErrorResponse {
        /// Error code.
        error: RevocationErrorCode,
        /// Human-readable description.
        error_description: Option<String>,
        /// URI of a page describing the error.
        error_uri: Option<String>,
    },

    /// Engine-level failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RevocationRequestError {
    /// Creates a protocol error with a description.
    #[must_use]
    pub fn new(error: RevocationErrorCode, description: impl Into<String>) -> Self {
        Self::ErrorResponse {
            error,
            error_description: Some(description.into()),
            error_uri: None,
        }
    }

    /// Returns the protocol error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<RevocationErrorCode> {
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
    fn test_parse_without_hint() {
        let request = HttpRequest::post().with_form("token", "rt1");

        let parsed = RevocationRequest::parse(&request).unwrap();
        assert_eq!(parsed.token, "rt1");
        assert!(parsed.token_type_hint.is_none());
    }

    #[test]
    fn test_duplicated_token() {
        let request = HttpRequest::post()
            .with_form("token", "a")
            .with_form("token", "b");

        let error = RevocationRequest::parse(&request).unwrap_err();
        assert_eq!(error.code(), Some(RevocationErrorCode::InvalidRequest));
        assert_eq!(error.description(), Some("'token' is duplicated."));
        assert_eq!(error.http_status(), 400);
    }

    #[test]
    fn test_error_body() {
        let error = RevocationRequestError::new(RevocationErrorCode::InvalidClient, "Invalid credentials.");
        assert_eq!(error.http_status(), 401);
        assert_eq!(error.to_body().unwrap().error, "invalid_client");
    }
}
