//! Provider facade.
//!
//! [`ProviderConfig`] bundles the storage backends and the injected
//! collaborators. [`Provider`] builds every endpoint handler from it once and
//! exposes one method per endpoint. Each method resolves the issuer first and
//! fails with [`ProviderError::IssuerNotFound`] for an unknown tenant.

use std::sync::Arc;

use crate::ProviderResult;
use crate::authorization::{SecurityTokenGenerator, UnsupportedSecurityTokenGenerator};
use crate::client_auth::{
    ClientAuthenticationManager, ClientAuthenticator, ClientSecretBasicAuthenticator,
    ClientSecretPostAuthenticator,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{Endpoint, IssuerConfig};
use crate::error::ProviderError;
use crate::handler::{
    AuthorizationRequestPostProcessHandler, AuthorizationRequestPreProcessHandler,
    IntrospectionRequestHandler, JwksRequestHandler, OAuth2MetadataRequestHandler,
    OidcMetadataRequestHandler, RevocationRequestHandler, TokenRequestHandler,
};
use crate::http::HttpRequest;
use crate::jwk::Jwks;
use crate::metadata::{OAuth2Metadata, OidcMetadata};
use crate::request::authorization::{
    AuthorizationRequestData, AuthorizationRequestError, AuthorizationResponse,
    AuthorizationResponseError,
};
use crate::request::introspection::{IntrospectionRequestError, IntrospectionResponse};
use crate::request::revocation::RevocationRequestError;
use crate::request::token::{TokenRequestError, TokenResponse};
use crate::storage::{
    AccessTokenStorage, AuthorizationCodeStorage, AuthorizationRequestDataStorage,
    ClientConfigStorage, IssuerConfigStorage, JwkConfigStorage, RefreshTokenStorage,
    UserClaimSetStorage,
};
use crate::token_generator::{SecureTokenGenerator, TokenGenerator};

// =============================================================================
// Configuration
// =============================================================================

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct ProviderConfig {
    pub issuers: Arc<dyn IssuerConfigStorage>,
    pub clients: Arc<dyn ClientConfigStorage>,
    pub jwks: Arc<dyn JwkConfigStorage>,
    pub user_claims: Arc<dyn UserClaimSetStorage>,
    pub authorization_request_data: Arc<dyn AuthorizationRequestDataStorage>,
    pub authorization_codes: Arc<dyn AuthorizationCodeStorage>,
    pub access_tokens: Arc<dyn AccessTokenStorage>,
    pub refresh_tokens: Arc<dyn RefreshTokenStorage>,
    pub clock: Arc<dyn Clock>,
    pub token_generator: Arc<dyn TokenGenerator>,
    pub security_token_generator: Arc<dyn SecurityTokenGenerator>,
    pub client_authentication: ClientAuthenticationManager,
    pub endpoint: Endpoint,
}

impl ProviderConfig {
    /// Creates a configuration over the given storages.
    ///
    /// Defaults: system clock, OS-backed token generator, token exchange
    /// refused, `client_secret_basic` and `client_secret_post` client
    /// authentication, default endpoint paths.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        issuers: Arc<dyn IssuerConfigStorage>,
        clients: Arc<dyn ClientConfigStorage>,
        jwks: Arc<dyn JwkConfigStorage>,
        user_claims: Arc<dyn UserClaimSetStorage>,
        authorization_request_data: Arc<dyn AuthorizationRequestDataStorage>,
        authorization_codes: Arc<dyn AuthorizationCodeStorage>,
        access_tokens: Arc<dyn AccessTokenStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
    ) -> Self {
        let client_authentication = ClientAuthenticationManager::new(vec![
            Arc::new(ClientSecretBasicAuthenticator::new(clients.clone())),
            Arc::new(ClientSecretPostAuthenticator::new(clients.clone())),
        ]);

        Self {
            issuers,
            clients,
            jwks,
            user_claims,
            authorization_request_data,
            authorization_codes,
            access_tokens,
            refresh_tokens,
            clock: Arc::new(SystemClock),
            token_generator: Arc::new(SecureTokenGenerator),
            security_token_generator: Arc::new(UnsupportedSecurityTokenGenerator),
            client_authentication,
            endpoint: Endpoint::default(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the token value generator.
    #[must_use]
    pub fn with_token_generator(mut self, token_generator: Arc<dyn TokenGenerator>) -> Self {
        self.token_generator = token_generator;
        self
    }

    /// Installs the token exchange generator.
    #[must_use]
    pub fn with_security_token_generator(
        mut self,
        security_token_generator: Arc<dyn SecurityTokenGenerator>,
    ) -> Self {
        self.security_token_generator = security_token_generator;
        self
    }

    /// Replaces the client authentication strategies.
    #[must_use]
    pub fn with_client_authenticators(
        mut self,
        authenticators: Vec<Arc<dyn ClientAuthenticator>>,
    ) -> Self {
        self.client_authentication = ClientAuthenticationManager::new(authenticators);
        self
    }

    /// Replaces the endpoint paths.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Resolves `issuer`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::IssuerNotFound`] for an unknown issuer.
    pub async fn find_issuer(&self, issuer: &str) -> ProviderResult<IssuerConfig> {
        self.issuers
            .find_by_issuer(issuer)
            .await?
            .ok_or_else(|| ProviderError::issuer_not_found(issuer))
    }
}

// =============================================================================
// Facade
// =============================================================================

/// Authorization server engine.
///
/// Transport agnostic: the host maps its HTTP framework's requests to
/// [`HttpRequest`] and renders the returned values and errors.
#[derive(Clone)]
pub struct Provider {
    config: ProviderConfig,
    oauth2_metadata: OAuth2MetadataRequestHandler,
    oidc_metadata: OidcMetadataRequestHandler,
    jwks: JwksRequestHandler,
    pre_process: AuthorizationRequestPreProcessHandler,
    post_process: AuthorizationRequestPostProcessHandler,
    token: TokenRequestHandler,
    introspection: IntrospectionRequestHandler,
    revocation: RevocationRequestHandler,
}

impl Provider {
    /// Builds every handler from `config`.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            oauth2_metadata: OAuth2MetadataRequestHandler::new(&config),
            oidc_metadata: OidcMetadataRequestHandler::new(&config),
            jwks: JwksRequestHandler::new(&config),
            pre_process: AuthorizationRequestPreProcessHandler::new(&config),
            post_process: AuthorizationRequestPostProcessHandler::new(&config),
            token: TokenRequestHandler::new(&config),
            introspection: IntrospectionRequestHandler::new(&config),
            revocation: RevocationRequestHandler::new(&config),
            config,
        }
    }

    /// Collaborators this provider was built from.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// OAuth 2.0 Authorization Server Metadata (RFC 8414).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for an unknown issuer or a storage failure.
    pub async fn handle_oauth2_metadata_request(
        &self,
        issuer: &str,
    ) -> ProviderResult<OAuth2Metadata> {
        let issuer = self.config.find_issuer(issuer).await?;
        Ok(self.oauth2_metadata.handle(&issuer))
    }

    /// OpenID Provider Configuration (OIDC Discovery §3).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for an unknown issuer or a storage failure.
    pub async fn handle_oidc_metadata_request(&self, issuer: &str) -> ProviderResult<OidcMetadata> {
        let issuer = self.config.find_issuer(issuer).await?;
        Ok(self.oidc_metadata.handle(&issuer))
    }

    /// Public signing keys of the issuer.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for an unknown issuer or a storage failure.
    pub async fn handle_jwks_request(&self, issuer: &str) -> ProviderResult<Jwks> {
        let issuer = self.config.find_issuer(issuer).await?;
        self.jwks.handle(&issuer).await
    }

    /// Validates an authorization request and stashes it for the login and
    /// consent UI.
    ///
    /// # Errors
    ///
    /// Returns the authorization endpoint error to render.
    pub async fn handle_authorization_request_pre_process(
        &self,
        issuer: &str,
        request: &HttpRequest,
    ) -> Result<AuthorizationRequestData, AuthorizationRequestError> {
        let issuer = self.config.find_issuer(issuer).await?;
        self.pre_process.handle(&issuer, request).await
    }

    /// Completes a stashed authorization request once the end user has
    /// authenticated and answered the consent prompt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for an unknown or expired key and an
    /// `access_denied` error response when consent was refused.
    pub async fn handle_authorization_request_post_process(
        &self,
        issuer: &str,
        subject: &str,
        key: &str,
        consent: bool,
    ) -> Result<AuthorizationResponse, AuthorizationResponseError> {
        let issuer = self.config.find_issuer(issuer).await?;
        self.post_process.handle(&issuer, subject, key, consent).await
    }

    /// Token endpoint.
    ///
    /// # Errors
    ///
    /// Returns the token endpoint error to render.
    pub async fn handle_token_request(
        &self,
        issuer: &str,
        request: &HttpRequest,
    ) -> Result<TokenResponse, TokenRequestError> {
        let issuer = self.config.find_issuer(issuer).await?;
        self.token.handle(&issuer, request).await
    }

    /// Token introspection endpoint (RFC 7662).
    ///
    /// # Errors
    ///
    /// Returns the introspection endpoint error to render.
    pub async fn handle_introspection_request(
        &self,
        issuer: &str,
        request: &HttpRequest,
    ) -> Result<IntrospectionResponse, IntrospectionRequestError> {
        let issuer = self.config.find_issuer(issuer).await?;
        self.introspection.handle(&issuer, request).await
    }

    /// Token revocation endpoint (RFC 7009).
    ///
    /// # Errors
    ///
    /// Returns the revocation endpoint error to render.
    pub async fn handle_revocation_request(
        &self,
        issuer: &str,
        request: &HttpRequest,
    ) -> Result<(), RevocationRequestError> {
        let issuer = self.config.find_issuer(issuer).await?;
        self.revocation.handle(&issuer, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, ISSUER};

    #[tokio::test]
    async fn test_unknown_issuer() {
        let provider = Fixture::new().provider();

        let result = provider.handle_jwks_request("http://unknown").await;
        assert!(matches!(result, Err(ProviderError::IssuerNotFound { .. })));

        let result = provider
            .handle_token_request("http://unknown", &HttpRequest::post())
            .await;
        assert!(matches!(
            result,
            Err(TokenRequestError::Provider(ProviderError::IssuerNotFound { .. }))
        ));

        let result = provider
            .handle_authorization_request_post_process("http://unknown", "alice", "k", true)
            .await;
        assert!(matches!(
            result,
            Err(AuthorizationResponseError::Provider(
                ProviderError::IssuerNotFound { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_discovery_documents() {
        let provider = Fixture::new().provider();

        let oauth2 = provider.handle_oauth2_metadata_request(ISSUER).await.unwrap();
        assert_eq!(oauth2.issuer, ISSUER);
        assert_eq!(oauth2.token_endpoint, "http://localhost/token");

        let oidc = provider.handle_oidc_metadata_request(ISSUER).await.unwrap();
        assert_eq!(oidc.issuer, ISSUER);

        let jwks = provider.handle_jwks_request(ISSUER).await.unwrap();
        assert_eq!(jwks.keys.len(), 1);
    }
}
