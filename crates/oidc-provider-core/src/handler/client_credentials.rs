//! Client credentials grant (RFC 6749 §4.4).

use std::sync::Arc;

use crate::authorization::AccessTokenGenerator;
use crate::client_auth::ClientAuthenticationManager;
use crate::config::IssuerConfig;
use crate::http::HttpRequest;
use crate::provider::ProviderConfig;
use crate::request::token::{ClientCredentialsGrantRequest, TokenRequestError, TokenResponse};
use crate::storage::AccessTokenStorage;

use super::authenticate_required;

/// Issues access tokens to authenticated clients acting on their own
/// behalf. No refresh token and no ID token.
#[derive(Clone)]
pub struct ClientCredentialsGrantHandler {
    client_authentication: ClientAuthenticationManager,
    access_tokens: Arc<dyn AccessTokenStorage>,
    access_token_generator: AccessTokenGenerator,
}

impl ClientCredentialsGrantHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client_authentication: config.client_authentication.clone(),
            access_tokens: config.access_tokens.clone(),
            access_token_generator: AccessTokenGenerator::new(
                config.clock.clone(),
                config.token_generator.clone(),
            ),
        }
    }

    /// Runs the grant.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when the client does not authenticate, and
    /// the request parser's errors.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<TokenResponse, TokenRequestError> {
        let client = authenticate_required(&self.client_authentication, issuer, request).await?;
        let grant = ClientCredentialsGrantRequest::parse(issuer, &client, request)?;

        let token = self
            .access_token_generator
            .generate(issuer, &client, grant.scope, None);
        self.access_tokens.save(&token).await?;

        tracing::debug!(issuer = %issuer.issuer, client_id = %client.id, grant_type = "client_credentials", "Tokens issued");

        Ok(TokenResponse {
            access_token: token.token,
            token_type: token.token_type,
            expires_in: Some(token.expires_in),
            refresh_token: None,
            scope: token.scope,
            id_token: None,
            issued_token_type: None,
        })
    }
}
