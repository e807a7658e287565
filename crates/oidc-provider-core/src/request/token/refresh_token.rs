use serde::{Deserialize, Serialize};

use crate::config::IssuerConfig;
use crate::http::HttpRequest;
use crate::metadata::GrantType;

use super::{TokenRequestError, optional_single, parse_grant_type, parse_scope, required_single};

/// `refresh_token` grant request (RFC 6749 §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenGrantRequest {
    /// Always [`GrantType::RefreshToken`].
    pub grant_type: GrantType,
    /// The refresh token being exchanged.
    pub refresh_token: String,
    /// Narrowed scope, `None` to keep the original grant's scope.
    pub scope: Option<Vec<String>>,
    /// Client identifier, required for public clients.
    pub client_id: Option<String>,
}

impl RefreshTokenGrantRequest {
    /// Parses the form body of `request`.
    ///
    /// Requested scopes are only checked against the issuer here; the owning
    /// client and the original grant are checked by the handler.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` or `invalid_request`.
    pub fn parse(issuer: &IssuerConfig, request: &HttpRequest) -> Result<Self, TokenRequestError> {
        let parameters = &request.form_parameters;

        let grant_type = parse_grant_type(parameters, GrantType::RefreshToken, |grant| {
            issuer.supported_grant_types.contains(&grant)
        })?;
        let refresh_token = required_single(parameters, "refresh_token")?;
        let scope = parse_scope(parameters, |scope| issuer.allows_scopes(scope))?;
        let client_id = optional_single(parameters, "client_id")?;

        Ok(Self {
            grant_type,
            refresh_token,
            scope,
            client_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::token::TokenErrorCode;

    fn issuer() -> IssuerConfig {
        IssuerConfig::new("http://localhost").with_scopes(["read", "write", "offline_access"])
    }

    #[test]
    fn test_parse_maps_refresh_token_grant() {
        let request = HttpRequest::post()
            .with_form("grant_type", "refresh_token")
            .with_form("refresh_token", "rt1")
            .with_form("scope", "read");

        let parsed = RefreshTokenGrantRequest::parse(&issuer(), &request).unwrap();
        assert_eq!(parsed.grant_type, GrantType::RefreshToken);
        assert_eq!(parsed.refresh_token, "rt1");
        assert_eq!(parsed.scope, Some(vec!["read".to_string()]));
        assert_eq!(parsed.client_id, None);
    }

    #[test]
    fn test_parse_client_id() {
        let request = HttpRequest::post()
            .with_form("grant_type", "refresh_token")
            .with_form("refresh_token", "rt1")
            .with_form("client_id", "pub");

        let parsed = RefreshTokenGrantRequest::parse(&issuer(), &request).unwrap();
        assert_eq!(parsed.client_id.as_deref(), Some("pub"));

        let request = request.with_form("client_id", "foo");
        let error = RefreshTokenGrantRequest::parse(&issuer(), &request).unwrap_err();
        assert_eq!(error.description(), Some("'client_id' is duplicated."));
    }

    #[test]
    fn test_refresh_token_is_required() {
        let request = HttpRequest::post().with_form("grant_type", "refresh_token");

        let error = RefreshTokenGrantRequest::parse(&issuer(), &request).unwrap_err();
        assert_eq!(error.description(), Some("'refresh_token' is required."));
    }

    #[test]
    fn test_scope_unknown_to_issuer() {
        let request = HttpRequest::post()
            .with_form("grant_type", "refresh_token")
            .with_form("refresh_token", "rt1")
            .with_form("scope", "admin");

        let error = RefreshTokenGrantRequest::parse(&issuer(), &request).unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::InvalidRequest));
    }
}
