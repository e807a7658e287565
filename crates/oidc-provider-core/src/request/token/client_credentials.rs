use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, IssuerConfig};
use crate::http::HttpRequest;
use crate::metadata::GrantType;

use super::{TokenRequestError, parse_grant_type, parse_scope};

/// `client_credentials` grant request (RFC 6749 §4.4.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentialsGrantRequest {
    /// Always [`GrantType::ClientCredentials`].
    pub grant_type: GrantType,
    /// Requested scopes.
    pub scope: Option<Vec<String>>,
}

impl ClientCredentialsGrantRequest {
    /// Parses the form body of `request` for the authenticated `client`.
    ///
    /// The grant type and every requested scope must be allowed for both the
    /// client and the issuer.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` or `invalid_request`.
    pub fn parse(
        issuer: &IssuerConfig,
        client: &ClientConfig,
        request: &HttpRequest,
    ) -> Result<Self, TokenRequestError> {
        let parameters = &request.form_parameters;

        let grant_type = parse_grant_type(parameters, GrantType::ClientCredentials, |grant| {
            client.supported_grant_types.contains(&grant)
                && issuer.supported_grant_types.contains(&grant)
        })?;
        let scope = parse_scope(parameters, |scope| {
            client.allows_scopes(scope) && issuer.allows_scopes(scope)
        })?;

        Ok(Self { grant_type, scope })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;
    use crate::request::token::TokenErrorCode;

    fn issuer() -> IssuerConfig {
        IssuerConfig::new("http://localhost").with_scopes(["read", "write", "admin"])
    }

    fn client() -> ClientConfig {
        ClientConfig::new("svc", "secret", ClientType::Confidential)
            .with_scopes(["read", "write"])
            .with_grant_types(vec![GrantType::ClientCredentials])
    }

    #[test]
    fn test_parse_with_scope() {
        let request = HttpRequest::post()
            .with_form("grant_type", "client_credentials")
            .with_form("scope", "read write");

        let parsed = ClientCredentialsGrantRequest::parse(&issuer(), &client(), &request).unwrap();
        assert_eq!(
            parsed.scope,
            Some(vec!["read".to_string(), "write".to_string()])
        );
    }

    #[test]
    fn test_scope_must_be_allowed_for_client() {
        let request = HttpRequest::post()
            .with_form("grant_type", "client_credentials")
            .with_form("scope", "admin");

        let error =
            ClientCredentialsGrantRequest::parse(&issuer(), &client(), &request).unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::InvalidRequest));
        assert_eq!(error.description(), Some("'scope' value not supported."));
    }

    #[test]
    fn test_grant_must_be_allowed_for_client() {
        let client = client().with_grant_types(vec![GrantType::AuthorizationCode]);
        let request = HttpRequest::post().with_form("grant_type", "client_credentials");

        let error = ClientCredentialsGrantRequest::parse(&issuer(), &client, &request).unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::UnsupportedGrantType));
        assert_eq!(error.description(), Some("Unsupported grant type."));
    }
}
