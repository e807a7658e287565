//! Token endpoint requests (RFC 6749 §4.1.3, §4.4.2, §6; RFC 8693).

mod authorization_code;
mod client_credentials;
mod refresh_token;
mod token_exchange;

pub use authorization_code::AuthorizationCodeGrantRequest;
pub use client_credentials::ClientCredentialsGrantRequest;
pub use refresh_token::RefreshTokenGrantRequest;
pub use token_exchange::TokenExchangeGrantRequest;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::{Parameters, required, single, single_or_none, split_space_delimited};
use crate::metadata::{AccessTokenType, GrantType, TokenType};
use crate::request::{
    ErrorBody, duplicated_message, required_message, unknown_value_message,
    unsupported_value_message,
};

// =============================================================================
// Error codes
// =============================================================================

/// Token endpoint error codes (RFC 6749 §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// Malformed or missing parameter.
    InvalidRequest,
    /// Client authentication failed.
    InvalidClient,
    /// Grant or refresh token invalid, expired or revoked.
    InvalidGrant,
    /// Client may not use this grant type.
    UnauthorizedClient,
    /// Grant type not supported.
    UnsupportedGrantType,
    /// Scope invalid, unknown or exceeding the grant.
    InvalidScope,
}

impl TokenErrorCode {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
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

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failures of the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenRequestError {
    /// Protocol error returned to the client as JSON.
    #[error("{error}: {}", .error_description.as_deref().unwrap_or_default())]
    ErrorResponse {
        /// Error code.
        error: TokenErrorCode,
        /// Human-readable description.
        error_description: Option<String>,
        /// URI of a page describing the error.
        error_uri: Option<String>,
    },

    /// Engine-level failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl TokenRequestError {
    /// Creates a protocol error with a description.
    #[must_use]
    pub fn new(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self::ErrorResponse {
            error,
            error_description: Some(description.into()),
            error_uri: None,
        }
    }

    /// Creates an `invalid_request` error.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(TokenErrorCode::InvalidRequest, description)
    }

    /// Creates an `invalid_client` error.
    #[must_use]
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(TokenErrorCode::InvalidClient, description)
    }

    /// Creates an `invalid_grant` error.
    #[must_use]
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(TokenErrorCode::InvalidGrant, description)
    }

    /// Creates an `unsupported_grant_type` error.
    #[must_use]
    pub fn unsupported_grant_type(description: impl Into<String>) -> Self {
        Self::new(TokenErrorCode::UnsupportedGrantType, description)
    }

    /// Creates an `invalid_scope` error.
    #[must_use]
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::new(TokenErrorCode::InvalidScope, description)
    }

    /// Returns the protocol error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<TokenErrorCode> {
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

// =============================================================================
// Response
// =============================================================================

/// Successful token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Issued token.
    pub access_token: String,

    /// Token type.
    pub token_type: AccessTokenType,

    /// Lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Refresh token, when one was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scope, space-delimited on the wire.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "space_delimited"
    )]
    pub scope: Option<Vec<String>>,

    /// ID token, when one was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Type of the issued token (RFC 8693 §2.2.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_token_type: Option<TokenType>,
}

mod space_delimited {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::http::split_space_delimited;

    pub fn serialize<S: Serializer>(
        scope: &Option<Vec<String>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match scope {
            Some(scope) => serializer.serialize_str(&scope.join(" ")),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|value| split_space_delimited(&value)))
    }
}

// =============================================================================
// Shared parameter parsing
// =============================================================================

/// Parses `grant_type`, requiring `expected` and that `allowed` accepts it.
fn parse_grant_type(
    parameters: &Parameters,
    expected: GrantType,
    allowed: impl FnOnce(GrantType) -> bool,
) -> Result<GrantType, TokenRequestError> {
    let value = required_single(parameters, "grant_type")?;

    if value != expected.as_str() {
        return Err(TokenRequestError::unsupported_grant_type(
            unknown_value_message("grant_type"),
        ));
    }

    if allowed(expected) {
        Ok(expected)
    } else {
        Err(TokenRequestError::unsupported_grant_type(
            "Unsupported grant type.",
        ))
    }
}

fn required_single(parameters: &Parameters, name: &str) -> Result<String, TokenRequestError> {
    let values = required(parameters.get(name).map(Vec::as_slice), || {
        TokenRequestError::invalid_request(required_message(name))
    })?;
    single(values, || {
        TokenRequestError::invalid_request(duplicated_message(name))
    })
}

fn optional_single(
    parameters: &Parameters,
    name: &str,
) -> Result<Option<String>, TokenRequestError> {
    single_or_none(parameters.get(name).map(Vec::as_slice), || {
        TokenRequestError::invalid_request(duplicated_message(name))
    })
}

/// Parses `scope`, requiring every value to pass `allowed`.
fn parse_scope(
    parameters: &Parameters,
    allowed: impl FnOnce(&[String]) -> bool,
) -> Result<Option<Vec<String>>, TokenRequestError> {
    let Some(value) = optional_single(parameters, "scope")? else {
        return Ok(None);
    };

    let scope = split_space_delimited(&value);
    if allowed(&scope) {
        Ok(Some(scope))
    } else {
        Err(TokenRequestError::invalid_request(
            unsupported_value_message("scope"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_and_status() {
        let error = TokenRequestError::invalid_client("Invalid client.");
        assert_eq!(error.http_status(), 401);
        assert_eq!(error.code(), Some(TokenErrorCode::InvalidClient));
        assert_eq!(
            error.to_body(),
            Some(ErrorBody::new(
                "invalid_client",
                Some("Invalid client.".to_string()),
                None
            ))
        );

        let error = TokenRequestError::invalid_grant("Refresh token expired.");
        assert_eq!(error.http_status(), 400);

        let error = TokenRequestError::from(ProviderError::storage("down"));
        assert_eq!(error.http_status(), 500);
        assert!(error.to_body().is_none());
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse {
            access_token: "at".to_string(),
            token_type: AccessTokenType::Bearer,
            expires_in: Some(3600),
            refresh_token: None,
            scope: Some(vec!["read".to_string(), "write".to_string()]),
            id_token: None,
            issued_token_type: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "access_token": "at",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "read write",
            })
        );

        let parsed: TokenResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_parse_grant_type() {
        let mut parameters = Parameters::new();
        assert!(matches!(
            parse_grant_type(&parameters, GrantType::ClientCredentials, |_| true),
            Err(TokenRequestError::ErrorResponse {
                error: TokenErrorCode::InvalidRequest,
                ..
            })
        ));

        parameters.insert("grant_type".to_string(), vec!["password".to_string()]);
        let error = parse_grant_type(&parameters, GrantType::ClientCredentials, |_| true)
            .unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::UnsupportedGrantType));
        assert_eq!(error.description(), Some("'grant_type' value is unknown."));

        parameters.insert(
            "grant_type".to_string(),
            vec!["client_credentials".to_string()],
        );
        let error = parse_grant_type(&parameters, GrantType::ClientCredentials, |_| false)
            .unwrap_err();
        assert_eq!(error.description(), Some("Unsupported grant type."));

        assert_eq!(
            parse_grant_type(&parameters, GrantType::ClientCredentials, |_| true).unwrap(),
            GrantType::ClientCredentials
        );
    }
}
