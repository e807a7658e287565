//! Refresh token grant (RFC 6749 §6).
//!
//! Refresh tokens rotate: a successful exchange deletes the presented token
//! and returns a new one alongside the new access token.

use std::sync::Arc;

use crate::authorization::{AccessTokenGenerator, RefreshToken, RefreshTokenGenerator};
use crate::client_auth::ClientAuthenticationManager;
use crate::clock::Clock;
use crate::config::{ClientConfig, IssuerConfig};
use crate::http::HttpRequest;
use crate::provider::ProviderConfig;
use crate::request::token::{RefreshTokenGrantRequest, TokenRequestError, TokenResponse};
use crate::storage::{AccessTokenStorage, ClientConfigStorage, RefreshTokenStorage};

use super::{authenticate_optional, verify_client_identity};

/// Exchanges a refresh token for a new access and refresh token.
#[derive(Clone)]
pub struct RefreshTokenGrantHandler {
    client_authentication: ClientAuthenticationManager,
    clients: Arc<dyn ClientConfigStorage>,
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    clock: Arc<dyn Clock>,
    access_token_generator: AccessTokenGenerator,
    refresh_token_generator: RefreshTokenGenerator,
}

impl RefreshTokenGrantHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client_authentication: config.client_authentication.clone(),
            clients: config.clients.clone(),
            access_tokens: config.access_tokens.clone(),
            refresh_tokens: config.refresh_tokens.clone(),
            clock: config.clock.clone(),
            access_token_generator: AccessTokenGenerator::new(
                config.clock.clone(),
                config.token_generator.clone(),
            ),
            refresh_token_generator: RefreshTokenGenerator::new(
                config.clock.clone(),
                config.token_generator.clone(),
            ),
        }
    }

    /// Runs the grant.
    ///
    /// A narrowed `scope` must stay within the original grant and within
    /// what the issuer and the client allow today.
    ///
    /// # Errors
    ///
    /// Returns the token endpoint error of the first failing check.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<TokenResponse, TokenRequestError> {
        let authenticated =
            authenticate_optional(&self.client_authentication, issuer, request).await?;
        let grant = RefreshTokenGrantRequest::parse(issuer, request)?;

        let refresh_token = self
            .refresh_tokens
            .find_by_token(&issuer.issuer, &grant.refresh_token)
            .await?
            .ok_or_else(|| TokenRequestError::invalid_grant("Refresh token is invalid."))?;
        if refresh_token.is_expired(self.clock.epoch_second()) {
            tracing::warn!(issuer = %issuer.issuer, client_id = %refresh_token.client_id, "Refresh token expired");
            return Err(TokenRequestError::invalid_grant("Refresh token expired."));
        }

        let client = self
            .verify_client(issuer, &grant, &refresh_token, authenticated.as_ref())
            .await?;
        let scope = verify_scope(issuer, &client, &refresh_token, grant.scope)?;

        if !self
            .refresh_tokens
            .delete(&issuer.issuer, &refresh_token.token)
            .await?
        {
            return Err(TokenRequestError::invalid_grant("Refresh token is invalid."));
        }

        let subject = refresh_token.subject;
        let new_refresh_token =
            self.refresh_token_generator
                .generate(issuer, &client, scope.clone(), subject.clone());
        self.refresh_tokens.save(&new_refresh_token).await?;

        let access_token = self
            .access_token_generator
            .generate(issuer, &client, scope.clone(), subject);
        self.access_tokens.save(&access_token).await?;

        tracing::debug!(issuer = %issuer.issuer, client_id = %client.id, grant_type = "refresh_token", "Tokens issued");

        Ok(TokenResponse {
            access_token: access_token.token,
            token_type: access_token.token_type,
            expires_in: Some(access_token.expires_in),
            refresh_token: Some(new_refresh_token.token),
            scope,
            id_token: None,
            issued_token_type: None,
        })
    }

    async fn verify_client(
        &self,
        issuer: &IssuerConfig,
        grant: &RefreshTokenGrantRequest,
        refresh_token: &RefreshToken,
        authenticated: Option<&ClientConfig>,
    ) -> Result<ClientConfig, TokenRequestError> {
        let client = self
            .clients
            .find_by_id(&issuer.issuer, &refresh_token.client_id)
            .await?
            .ok_or_else(|| TokenRequestError::invalid_grant("Unknown client."))?;

        if let Some(authenticated) = authenticated.filter(|a| a.id != client.id) {
            tracing::warn!(
                issuer = %issuer.issuer,
                client_id = %authenticated.id,
                owner = %client.id,
                "Refresh token presented by another client"
            );
            return Err(TokenRequestError::invalid_grant("Refresh token is invalid."));
        }

        verify_client_identity(&client, authenticated, grant.client_id.as_deref())?;
        Ok(client)
    }
}

/// Resolves the scope of the new tokens: the requested scope, else the
/// original grant's.
fn verify_scope(
    issuer: &IssuerConfig,
    client: &ClientConfig,
    refresh_token: &RefreshToken,
    requested: Option<Vec<String>>,
) -> Result<Option<Vec<String>>, TokenRequestError> {
    let Some(scope) = requested.or_else(|| refresh_token.scope.clone()) else {
        return Ok(None);
    };

    let granted = refresh_token.scope.as_deref().unwrap_or_default();
    let within_grant = scope.iter().all(|s| granted.contains(s));
    if within_grant && issuer.allows_scopes(&scope) && client.allows_scopes(&scope) {
        Ok(Some(scope))
    } else {
        Err(TokenRequestError::invalid_scope("Invalid scope."))
    }
}
