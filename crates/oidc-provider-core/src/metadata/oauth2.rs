//! OAuth 2.0 Authorization Server Metadata (RFC 8414).

use serde::{Deserialize, Serialize};

use super::{
    GrantType, PkceCodeChallengeMethod, ResponseMode, ResponseType, TokenEndpointAuthMethod,
    endpoint_url,
};
use crate::config::{Endpoint, IssuerConfig};

/// Authorization server metadata document.
///
/// Served at `/.well-known/oauth-authorization-server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Metadata {
    /// Issuer identifier.
    pub issuer: String,

    /// Authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Token endpoint URL.
    pub token_endpoint: String,

    /// JWK Set URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,

    /// Dynamic client registration endpoint (RFC 7591).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    /// Supported scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// Supported `response_type` values.
    pub response_types_supported: Vec<ResponseType>,

    /// Supported `response_mode` values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modes_supported: Option<Vec<ResponseMode>>,

    /// Supported grant types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<GrantType>>,

    /// Client authentication methods at the token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<TokenEndpointAuthMethod>>,

    /// Human-readable documentation URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_documentation: Option<String>,

    /// Supported UI languages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_locales_supported: Option<Vec<String>>,

    /// Policy URL for client registrants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_policy_uri: Option<String>,

    /// Terms of service URL for client registrants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_tos_uri: Option<String>,

    /// Revocation endpoint URL (RFC 7009).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint: Option<String>,

    /// Client authentication methods at the revocation endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint_auth_methods_supported: Option<Vec<TokenEndpointAuthMethod>>,

    /// Introspection endpoint URL (RFC 7662).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,

    /// Client authentication methods at the introspection endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint_auth_methods_supported: Option<Vec<TokenEndpointAuthMethod>>,

    /// Supported PKCE methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<PkceCodeChallengeMethod>>,
}

impl OAuth2Metadata {
    /// Builds the document for `issuer`, resolving endpoint paths against
    /// the issuer URL.
    #[must_use]
    pub fn build(issuer: &IssuerConfig, endpoint: &Endpoint) -> Self {
        let base = issuer.issuer.as_str();
        let basic = || Some(vec![TokenEndpointAuthMethod::ClientSecretBasic]);

        Self {
            issuer: issuer.issuer.clone(),
            authorization_endpoint: endpoint_url(base, &endpoint.authorization_endpoint),
            token_endpoint: endpoint_url(base, &endpoint.token_endpoint),
            jwks_uri: Some(endpoint_url(base, &endpoint.jwks_endpoint)),
            registration_endpoint: None,
            scopes_supported: None,
            response_types_supported: issuer.supported_response_types.clone(),
            response_modes_supported: Some(vec![ResponseMode::Query]),
            grant_types_supported: Some(issuer.supported_grant_types.clone()),
            token_endpoint_auth_methods_supported: basic(),
            service_documentation: None,
            ui_locales_supported: None,
            op_policy_uri: None,
            op_tos_uri: None,
            revocation_endpoint: Some(endpoint_url(base, &endpoint.revocation_endpoint)),
            revocation_endpoint_auth_methods_supported: basic(),
            introspection_endpoint: Some(endpoint_url(base, &endpoint.introspection_endpoint)),
            introspection_endpoint_auth_methods_supported: basic(),
            code_challenge_methods_supported: Some(vec![PkceCodeChallengeMethod::S256]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_issuer() {
        let issuer = IssuerConfig::new("http://localhost");
        let metadata = OAuth2Metadata::build(&issuer, &Endpoint::default());

        assert_eq!(metadata.issuer, "http://localhost");
        assert_eq!(metadata.authorization_endpoint, "http://localhost/auth");
        assert_eq!(metadata.token_endpoint, "http://localhost/token");
        assert_eq!(metadata.jwks_uri.as_deref(), Some("http://localhost/jwks"));
        assert_eq!(
            metadata.revocation_endpoint.as_deref(),
            Some("http://localhost/revocation")
        );
        assert_eq!(metadata.response_types_supported, vec![ResponseType::Code]);
        assert_eq!(
            metadata.grant_types_supported,
            Some(issuer.supported_grant_types.clone())
        );
    }

    #[test]
    fn test_serialization_omits_absent_fields() {
        let metadata =
            OAuth2Metadata::build(&IssuerConfig::new("http://localhost"), &Endpoint::default());
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["response_modes_supported"], serde_json::json!(["query"]));
        assert_eq!(
            json["token_endpoint_auth_methods_supported"],
            serde_json::json!(["client_secret_basic"])
        );
        assert_eq!(
            json["code_challenge_methods_supported"],
            serde_json::json!(["S256"])
        );
        assert!(json.get("registration_endpoint").is_none());
        assert!(json.get("scopes_supported").is_none());
    }
}
