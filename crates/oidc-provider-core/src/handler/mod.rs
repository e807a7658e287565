//! Endpoint handlers.
//!
//! Each handler owns the collaborators it needs, cloned out of a
//! [`ProviderConfig`](crate::ProviderConfig), and runs one request to
//! completion: a typed response or a typed error from the endpoint's error
//! family. Steps short-circuit on the first failure.

mod authorization;
mod authorization_code;
mod client_credentials;
mod introspection;
mod metadata;
mod refresh_token;
mod revocation;
mod token;
mod token_exchange;

pub use authorization::{
    AuthorizationRequestPostProcessHandler, AuthorizationRequestPreProcessHandler,
};
pub use authorization_code::{AuthorizationCodeGrantHandler, verify_code_challenge};
pub use client_credentials::ClientCredentialsGrantHandler;
pub use introspection::IntrospectionRequestHandler;
pub use metadata::{JwksRequestHandler, OAuth2MetadataRequestHandler, OidcMetadataRequestHandler};
pub use refresh_token::RefreshTokenGrantHandler;
pub use revocation::RevocationRequestHandler;
pub use token::TokenRequestHandler;
pub use token_exchange::TokenExchangeGrantHandler;

use crate::ProviderResult;
use crate::authorization::{AccessToken, RefreshToken};
use crate::client_auth::{ClientAuthenticationError, ClientAuthenticationManager};
use crate::config::{ClientConfig, IssuerConfig};
use crate::http::HttpRequest;
use crate::metadata::TokenTypeHint;
use crate::request::token::{TokenErrorCode, TokenRequestError};
use crate::storage::{AccessTokenStorage, RefreshTokenStorage};

/// Authenticates the client of a grant that also admits public clients.
///
/// A request without credentials yields `None`; the grant handler decides
/// from the client type whether that is acceptable.
async fn authenticate_optional(
    manager: &ClientAuthenticationManager,
    issuer: &IssuerConfig,
    request: &HttpRequest,
) -> Result<Option<ClientConfig>, TokenRequestError> {
    match manager.authenticate(issuer, request).await {
        Ok(client) => Ok(Some(client)),
        Err(ClientAuthenticationError::UnmatchedAuthenticationMethod) => Ok(None),
        Err(ClientAuthenticationError::InvalidCredentials) => {
            Err(TokenRequestError::invalid_client("Invalid credentials."))
        }
        Err(ClientAuthenticationError::InvalidRequest { description }) => {
            Err(TokenRequestError::ErrorResponse {
                error: TokenErrorCode::InvalidRequest,
                error_description: description,
                error_uri: None,
            })
        }
        Err(ClientAuthenticationError::Provider(e)) => Err(e.into()),
    }
}

/// Authenticates the client of a grant reserved to authenticated clients.
async fn authenticate_required(
    manager: &ClientAuthenticationManager,
    issuer: &IssuerConfig,
    request: &HttpRequest,
) -> Result<ClientConfig, TokenRequestError> {
    match manager.authenticate(issuer, request).await {
        Ok(client) => Ok(client),
        Err(
            ClientAuthenticationError::UnmatchedAuthenticationMethod
            | ClientAuthenticationError::InvalidCredentials,
        ) => Err(TokenRequestError::invalid_client("Invalid client.")),
        Err(ClientAuthenticationError::InvalidRequest { description }) => {
            Err(TokenRequestError::ErrorResponse {
                error: TokenErrorCode::InvalidRequest,
                error_description: description,
                error_uri: None,
            })
        }
        Err(ClientAuthenticationError::Provider(e)) => Err(e.into()),
    }
}

/// Checks that the caller may act as `client`, the owner of a code or
/// refresh token. Confidential clients must have authenticated; public
/// clients identify themselves with the `client_id` form parameter.
fn verify_client_identity(
    client: &ClientConfig,
    authenticated: Option<&ClientConfig>,
    client_id: Option<&str>,
) -> Result<(), TokenRequestError> {
    if client.is_confidential() {
        if authenticated.is_none() {
            return Err(TokenRequestError::invalid_client(
                "Client authentication required.",
            ));
        }
        return Ok(());
    }

    match client_id {
        None => Err(TokenRequestError::invalid_client("'client_id' is required.")),
        Some(client_id) if client_id != client.id => {
            Err(TokenRequestError::invalid_client("Invalid client."))
        }
        _ => Ok(()),
    }
}

/// A token found by [`find_token`].
enum StoredToken {
    Access(AccessToken),
    Refresh(RefreshToken),
}

impl StoredToken {
    fn client_id(&self) -> &str {
        match self {
            Self::Access(token) => &token.client_id,
            Self::Refresh(token) => &token.client_id,
        }
    }

    fn is_expired(&self, now: i64) -> bool {
        match self {
            Self::Access(token) => token.is_expired(now),
            Self::Refresh(token) => token.is_expired(now),
        }
    }
}

/// Looks `token` up in both token stores, the hinted one first.
async fn find_token(
    access_tokens: &dyn AccessTokenStorage,
    refresh_tokens: &dyn RefreshTokenStorage,
    issuer: &str,
    token: &str,
    hint: Option<TokenTypeHint>,
) -> ProviderResult<Option<StoredToken>> {
    let access_first = hint != Some(TokenTypeHint::RefreshToken);

    if access_first
        && let Some(found) = access_tokens.find_by_token(issuer, token).await?
    {
        return Ok(Some(StoredToken::Access(found)));
    }
    if let Some(found) = refresh_tokens.find_by_token(issuer, token).await? {
        return Ok(Some(StoredToken::Refresh(found)));
    }
    if !access_first && let Some(found) = access_tokens.find_by_token(issuer, token).await? {
        return Ok(Some(StoredToken::Access(found)));
    }
    Ok(None)
}
