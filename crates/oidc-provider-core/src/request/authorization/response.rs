//! Authorization endpoint responses.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::metadata::{AccessTokenType, ResponseMode, ResponseType};

use super::AuthorizationErrorCode;

/// Access token issued directly from the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponseToken {
    /// Token value.
    pub access_token: String,
    /// Token type.
    pub token_type: AccessTokenType,
    /// Lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Space-delimited granted scope.
    pub scope: Option<String>,
}

/// Authorization code issued from the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponseCode {
    /// Code value.
    pub code: String,
}

/// ID token issued from the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponseIdToken {
    /// Compact JWS.
    pub id_token: String,
}

/// Successful outcome of the post-process step.
///
/// The host renders it as a redirect (query or fragment) or a form post,
/// according to `response_mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    /// Implicit access token, when `token` was requested.
    pub token: Option<AuthorizationResponseToken>,
    /// Authorization code, when `code` was requested.
    pub code: Option<AuthorizationResponseCode>,
    /// ID token, when `id_token` was requested in an OpenID request.
    pub id_token: Option<AuthorizationResponseIdToken>,
    /// Redirect target.
    pub redirect_uri: String,
    /// Requested response types.
    pub response_type: Vec<ResponseType>,
    /// Requested response mode.
    pub response_mode: Option<ResponseMode>,
    /// Client state.
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Response mode to render with: the requested one, else the default for
    /// the response types (`query` for the pure code flow, `fragment`
    /// whenever a token is returned from the authorization endpoint).
    #[must_use]
    pub fn effective_response_mode(&self) -> ResponseMode {
        self.response_mode.unwrap_or_else(|| {
            if self.response_type.iter().all(|t| *t == ResponseType::Code) {
                ResponseMode::Query
            } else {
                ResponseMode::Fragment
            }
        })
    }

    /// Parameters to append to the redirect URI or post in a form.
    #[must_use]
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = Vec::new();
        if let Some(code) = &self.code {
            parameters.push(("code", code.code.clone()));
        }
        if let Some(token) = &self.token {
            parameters.push(("access_token", token.access_token.clone()));
            parameters.push(("token_type", token.token_type.as_str().to_string()));
            if let Some(expires_in) = token.expires_in {
                parameters.push(("expires_in", expires_in.to_string()));
            }
            if let Some(scope) = &token.scope {
                parameters.push(("scope", scope.clone()));
            }
        }
        if let Some(id_token) = &self.id_token {
            parameters.push(("id_token", id_token.id_token.clone()));
        }
        if let Some(state) = &self.state {
            parameters.push(("state", state.clone()));
        }
        parameters
    }
}

/// Failures of the post-process step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationResponseError {
    /// Error to be redirected to the client.
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

    /// The stashed request is unknown, expired or its client vanished.
    #[error("Invalid authorization request")]
    InvalidRequest,

    /// Engine-level failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AuthorizationResponseError {
    /// Creates an `access_denied` error bound to the original request.
    #[must_use]
    pub fn access_denied(redirect_uri: impl Into<String>, state: Option<String>) -> Self {
        Self::ErrorResponse {
            redirect_uri: redirect_uri.into(),
            error: AuthorizationErrorCode::AccessDenied,
            error_description: None,
            error_uri: None,
            state,
        }
    }

    /// Returns `true` for a redirectable error.
    #[must_use]
    pub fn is_redirectable(&self) -> bool {
        matches!(self, Self::ErrorResponse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(response_type: Vec<ResponseType>) -> AuthorizationResponse {
        AuthorizationResponse {
            token: None,
            code: Some(AuthorizationResponseCode {
                code: "c1".to_string(),
            }),
            id_token: None,
            redirect_uri: "http://localhost/cb".to_string(),
            response_type,
            response_mode: None,
            state: Some("xyz".to_string()),
        }
    }

    #[test]
    fn test_default_response_mode() {
        assert_eq!(
            response(vec![ResponseType::Code]).effective_response_mode(),
            ResponseMode::Query
        );
        assert_eq!(
            response(vec![ResponseType::Code, ResponseType::IdToken]).effective_response_mode(),
            ResponseMode::Fragment
        );

        let mut explicit = response(vec![ResponseType::Code]);
        explicit.response_mode = Some(ResponseMode::FormPost);
        assert_eq!(explicit.effective_response_mode(), ResponseMode::FormPost);
    }

    #[test]
    fn test_parameters() {
        let mut response = response(vec![ResponseType::Code, ResponseType::Token]);
        response.token = Some(AuthorizationResponseToken {
            access_token: "at".to_string(),
            token_type: AccessTokenType::Bearer,
            expires_in: Some(3600),
            scope: Some("read write".to_string()),
        });

        assert_eq!(
            response.parameters(),
            vec![
                ("code", "c1".to_string()),
                ("access_token", "at".to_string()),
                ("token_type", "Bearer".to_string()),
                ("expires_in", "3600".to_string()),
                ("scope", "read write".to_string()),
                ("state", "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn test_access_denied() {
        let error = AuthorizationResponseError::access_denied("http://localhost/cb", None);
        assert!(error.is_redirectable());
        assert!(matches!(
            error,
            AuthorizationResponseError::ErrorResponse {
                error: AuthorizationErrorCode::AccessDenied,
                ..
            }
        ));
        assert!(!AuthorizationResponseError::InvalidRequest.is_redirectable());
    }
}
