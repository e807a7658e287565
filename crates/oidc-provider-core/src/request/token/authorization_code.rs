use serde::{Deserialize, Serialize};

use crate::config::IssuerConfig;
use crate::http::HttpRequest;
use crate::metadata::GrantType;

use super::{TokenRequestError, optional_single, parse_grant_type, required_single};

/// `authorization_code` grant request (RFC 6749 §4.1.3, RFC 7636 §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeGrantRequest {
    /// Always [`GrantType::AuthorizationCode`].
    pub grant_type: GrantType,
    /// The authorization code.
    pub code: String,
    /// Redirect URI used in the authorization request.
    pub redirect_uri: Option<String>,
    /// Client identifier, required for public clients.
    pub client_id: Option<String>,
    /// PKCE verifier.
    pub code_verifier: Option<String>,
}

impl AuthorizationCodeGrantRequest {
    /// Parses the form body of `request`.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` when the grant is not enabled for
    /// `issuer` and `invalid_request` for missing or duplicated parameters.
    pub fn parse(issuer: &IssuerConfig, request: &HttpRequest) -> Result<Self, TokenRequestError> {
        let parameters = &request.form_parameters;

        let grant_type = parse_grant_type(parameters, GrantType::AuthorizationCode, |grant| {
            issuer.supported_grant_types.contains(&grant)
        })?;
        let code = required_single(parameters, "code")?;
        let redirect_uri = optional_single(parameters, "redirect_uri")?;
        let client_id = optional_single(parameters, "client_id")?;
        let code_verifier = optional_single(parameters, "code_verifier")?;

        Ok(Self {
            grant_type,
            code,
            redirect_uri,
            client_id,
            code_verifier,
        })
    }
}
