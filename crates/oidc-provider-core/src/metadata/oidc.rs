//! OpenID Provider Metadata (OpenID Connect Discovery 1.0 §3).

use serde::{Deserialize, Serialize};

use super::{
    ClaimType, Display, GrantType, ResponseMode, ResponseType, SubjectIdentifierType,
    TokenEndpointAuthMethod, endpoint_url,
};
use crate::config::{Endpoint, IssuerConfig};
use crate::jwk::SigningAlgorithm;

/// OpenID Provider configuration document.
///
/// Served at `/.well-known/openid-configuration`. Response types are listed
/// as space-delimited combinations (`"code id_token"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    pub response_types_supported: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modes_supported: Option<Vec<ResponseMode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<GrantType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr_values_supported: Option<Vec<String>>,
    pub subject_types_supported: Vec<SubjectIdentifierType>,
    pub id_token_signing_alg_values_supported: Vec<SigningAlgorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<TokenEndpointAuthMethod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_values_supported: Option<Vec<Display>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_types_supported: Option<Vec<ClaimType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_documentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_locales_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_locales_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_parameter_supported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_parameter_supported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri_parameter_supported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_request_uri_registration: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_policy_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_tos_uri: Option<String>,
}

/// Response type combinations advertised by every issuer.
const RESPONSE_TYPE_COMBINATIONS: &[&[ResponseType]] = &[
    &[ResponseType::Code],
    &[ResponseType::Code, ResponseType::IdToken],
    &[ResponseType::Token],
    &[ResponseType::Token, ResponseType::IdToken],
    &[ResponseType::IdToken],
];

impl OidcMetadata {
    /// Builds the document for `issuer`.
    #[must_use]
    pub fn build(issuer: &IssuerConfig, endpoint: &Endpoint) -> Self {
        let base = issuer.issuer.as_str();
        let response_types_supported = RESPONSE_TYPE_COMBINATIONS
            .iter()
            .map(|combination| {
                combination
                    .iter()
                    .map(ResponseType::as_str)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        Self {
            issuer: issuer.issuer.clone(),
            authorization_endpoint: endpoint_url(base, &endpoint.authorization_endpoint),
            token_endpoint: endpoint_url(base, &endpoint.token_endpoint),
            userinfo_endpoint: None,
            jwks_uri: endpoint_url(base, &endpoint.jwks_endpoint),
            registration_endpoint: None,
            scopes_supported: None,
            response_types_supported,
            response_modes_supported: None,
            grant_types_supported: None,
            acr_values_supported: None,
            subject_types_supported: vec![SubjectIdentifierType::Public],
            id_token_signing_alg_values_supported: vec![SigningAlgorithm::RS256],
            token_endpoint_auth_methods_supported: None,
            display_values_supported: None,
            claim_types_supported: None,
            claims_supported: None,
            service_documentation: None,
            claims_locales_supported: None,
            ui_locales_supported: None,
            claims_parameter_supported: None,
            request_parameter_supported: None,
            request_uri_parameter_supported: None,
            require_request_uri_registration: None,
            op_policy_uri: None,
            op_tos_uri: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_oidc_metadata() {
        let endpoint = Endpoint {
            jwks_endpoint: "/keys".to_string(),
            ..Endpoint::default()
        };
        let metadata = OidcMetadata::build(&IssuerConfig::new("http://localhost"), &endpoint);

        assert_eq!(metadata.jwks_uri, "http://localhost/keys");
        assert_eq!(
            metadata.response_types_supported,
            vec!["code", "code id_token", "token", "token id_token", "id_token"]
        );

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["subject_types_supported"], serde_json::json!(["public"]));
        assert_eq!(
            json["id_token_signing_alg_values_supported"],
            serde_json::json!(["RS256"])
        );
        assert!(json.get("userinfo_endpoint").is_none());
        assert!(json.get("grant_types_supported").is_none());
    }
}
