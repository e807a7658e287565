//! Token endpoint dispatcher.

use crate::config::IssuerConfig;
use crate::http::{HttpRequest, required, single};
use crate::metadata::GrantType;
use crate::provider::ProviderConfig;
use crate::request::token::{TokenRequestError, TokenResponse};
use crate::request::{duplicated_message, required_message, unknown_value_message};

use super::{
    AuthorizationCodeGrantHandler, ClientCredentialsGrantHandler, RefreshTokenGrantHandler,
    TokenExchangeGrantHandler,
};

/// Routes a token request to its grant handler by `grant_type`.
#[derive(Clone)]
pub struct TokenRequestHandler {
    authorization_code: AuthorizationCodeGrantHandler,
    client_credentials: ClientCredentialsGrantHandler,
    refresh_token: RefreshTokenGrantHandler,
    token_exchange: TokenExchangeGrantHandler,
}

impl TokenRequestHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            authorization_code: AuthorizationCodeGrantHandler::new(config),
            client_credentials: ClientCredentialsGrantHandler::new(config),
            refresh_token: RefreshTokenGrantHandler::new(config),
            token_exchange: TokenExchangeGrantHandler::new(config),
        }
    }

    /// Dispatches `request`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for a missing or duplicated `grant_type`,
    /// `unsupported_grant_type` for an unknown or unimplemented one, and the
    /// grant handler's errors otherwise.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<TokenResponse, TokenRequestError> {
        let values = required(request.form("grant_type"), || {
            TokenRequestError::invalid_request(required_message("grant_type"))
        })?;
        let value = single(values, || {
            TokenRequestError::invalid_request(duplicated_message("grant_type"))
        })?;
        let grant_type = GrantType::parse(&value).ok_or_else(|| {
            TokenRequestError::unsupported_grant_type(unknown_value_message("grant_type"))
        })?;

        match grant_type {
            GrantType::AuthorizationCode => self.authorization_code.handle(issuer, request).await,
            GrantType::ClientCredentials => self.client_credentials.handle(issuer, request).await,
            GrantType::RefreshToken => self.refresh_token.handle(issuer, request).await,
            GrantType::TokenExchange => self.token_exchange.handle(issuer, request).await,
            GrantType::Implicit
            | GrantType::Password
            | GrantType::JwtBearer
            | GrantType::Saml2Bearer => {
                tracing::debug!(issuer = %issuer.issuer, grant_type = %grant_type, "Unsupported grant type");
                Err(TokenRequestError::unsupported_grant_type(
                    "Unsupported grant type.",
                ))
            }
        }
    }
}
