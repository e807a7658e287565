//! Discovery documents and the public key set.

use std::sync::Arc;

use crate::ProviderResult;
use crate::config::{Endpoint, IssuerConfig};
use crate::jwk::Jwks;
use crate::metadata::{OAuth2Metadata, OidcMetadata};
use crate::provider::ProviderConfig;
use crate::storage::JwkConfigStorage;

/// Serves `/.well-known/oauth-authorization-server`.
#[derive(Debug, Clone)]
pub struct OAuth2MetadataRequestHandler {
    endpoint: Endpoint,
}

impl OAuth2MetadataRequestHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
        }
    }

    #[must_use]
    pub fn handle(&self, issuer: &IssuerConfig) -> OAuth2Metadata {
        OAuth2Metadata::build(issuer, &self.endpoint)
    }
}

/// Serves `/.well-known/openid-configuration`.
#[derive(Debug, Clone)]
pub struct OidcMetadataRequestHandler {
    endpoint: Endpoint,
}

impl OidcMetadataRequestHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
        }
    }

    #[must_use]
    pub fn handle(&self, issuer: &IssuerConfig) -> OidcMetadata {
        OidcMetadata::build(issuer, &self.endpoint)
    }
}

/// Publishes the public half of every key registered for an issuer.
#[derive(Clone)]
pub struct JwksRequestHandler {
    jwks: Arc<dyn JwkConfigStorage>,
}

impl JwksRequestHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            jwks: config.jwks.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns the storage failure, if any.
    pub async fn handle(&self, issuer: &IssuerConfig) -> ProviderResult<Jwks> {
        let keys = self
            .jwks
            .find_by_issuer(&issuer.issuer)
            .await?
            .iter()
            .map(|key| key.to_jwk())
            .collect();
        Ok(Jwks { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, ISSUER};

    #[test]
    fn test_metadata_uses_configured_endpoints() {
        let fixture = Fixture::new();
        let endpoint = Endpoint {
            token_endpoint: "/oauth/token".to_string(),
            ..Endpoint::default()
        };
        let config = fixture.config.clone().with_endpoint(endpoint);

        let oauth2 = OAuth2MetadataRequestHandler::new(&config).handle(&fixture.issuer);
        assert_eq!(oauth2.issuer, ISSUER);
        assert_eq!(oauth2.token_endpoint, "http://localhost/oauth/token");

        let oidc = OidcMetadataRequestHandler::new(&config).handle(&fixture.issuer);
        assert_eq!(oidc.token_endpoint, "http://localhost/oauth/token");
    }

    #[tokio::test]
    async fn test_jwks_exposes_public_keys_only() {
        let fixture = Fixture::new();
        let handler = JwksRequestHandler::new(&fixture.config);

        let jwks = handler.handle(&fixture.issuer).await.unwrap();
        assert_eq!(jwks.keys.len(), 1);

        let json = serde_json::to_value(&jwks).unwrap();
        let key = &json["keys"][0];
        assert_eq!(key["kty"], "EC");
        assert!(key.get("d").is_none());
    }
}
