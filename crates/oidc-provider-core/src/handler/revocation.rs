//! Token revocation (RFC 7009).

use std::sync::Arc;

use crate::client_auth::{ClientAuthenticationError, ClientAuthenticationManager};
use crate::config::{ClientConfig, IssuerConfig};
use crate::http::HttpRequest;
use crate::provider::ProviderConfig;
use crate::request::revocation::{RevocationErrorCode, RevocationRequest, RevocationRequestError};
use crate::storage::{AccessTokenStorage, ClientConfigStorage, RefreshTokenStorage};

use super::{StoredToken, find_token};

/// Deletes access and refresh tokens on behalf of their owning client.
#[derive(Clone)]
pub struct RevocationRequestHandler {
    client_authentication: ClientAuthenticationManager,
    clients: Arc<dyn ClientConfigStorage>,
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
}

impl RevocationRequestHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client_authentication: config.client_authentication.clone(),
            clients: config.clients.clone(),
            access_tokens: config.access_tokens.clone(),
            refresh_tokens: config.refresh_tokens.clone(),
        }
    }

    /// Revokes the token in `request`. An unknown token is not an error.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for a malformed body, `invalid_client` for
    /// bad or missing credentials, and `invalid_grant` when the token
    /// belongs to another client.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<(), RevocationRequestError> {
        let revocation = RevocationRequest::parse(request)?;

        let authenticated = match self.client_authentication.authenticate(issuer, request).await {
            Ok(client) => Some(client),
            Err(ClientAuthenticationError::UnmatchedAuthenticationMethod) => None,
            Err(ClientAuthenticationError::InvalidCredentials) => {
                return Err(RevocationRequestError::new(
                    RevocationErrorCode::InvalidClient,
                    "Invalid credentials.",
                ));
            }
            Err(ClientAuthenticationError::InvalidRequest { description }) => {
                return Err(RevocationRequestError::ErrorResponse {
                    error: RevocationErrorCode::InvalidRequest,
                    error_description: description,
                    error_uri: None,
                });
            }
            Err(ClientAuthenticationError::Provider(e)) => return Err(e.into()),
        };

        let Some(found) = find_token(
            self.access_tokens.as_ref(),
            self.refresh_tokens.as_ref(),
            &issuer.issuer,
            &revocation.token,
            revocation.token_type_hint,
        )
        .await?
        else {
            tracing::debug!(issuer = %issuer.issuer, "Revoked token not found");
            return Ok(());
        };

        let owner = found.client_id().to_string();
        self.verify_client(issuer, &owner, authenticated.as_ref())
            .await?;

        match found {
            StoredToken::Access(token) => {
                self.access_tokens.delete(&issuer.issuer, &token.token).await?;
            }
            StoredToken::Refresh(token) => {
                self.refresh_tokens.delete(&issuer.issuer, &token.token).await?;
            }
        }
        tracing::info!(issuer = %issuer.issuer, client_id = %owner, "Token revoked");
        Ok(())
    }

    async fn verify_client(
        &self,
        issuer: &IssuerConfig,
        owner: &str,
        authenticated: Option<&ClientConfig>,
    ) -> Result<(), RevocationRequestError> {
        let client = self
            .clients
            .find_by_id(&issuer.issuer, owner)
            .await?
            .ok_or_else(|| {
                RevocationRequestError::new(RevocationErrorCode::InvalidGrant, "Unknown client.")
            })?;

        match authenticated {
            Some(authenticated) if authenticated.id != client.id => {
                tracing::warn!(
                    issuer = %issuer.issuer,
                    client_id = %authenticated.id,
                    owner = %client.id,
                    "Revocation of another client's token"
                );
                Err(RevocationRequestError::new(
                    RevocationErrorCode::InvalidGrant,
                    "Invalid client.",
                ))
            }
            None if client.is_confidential() => Err(RevocationRequestError::new(
                RevocationErrorCode::InvalidClient,
                "Client authentication required.",
            )),
            _ => Ok(()),
        }
    }
}
