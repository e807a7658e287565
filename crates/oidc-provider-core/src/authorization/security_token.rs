//! Token exchange extension point (RFC 8693).
//!
//! The engine authenticates the client, parses the request and validates
//! the tokens it issued itself. Minting the exchanged token is delegated to
//! a [`SecurityTokenGenerator`] supplied by the host.

use async_trait::async_trait;

use crate::config::{ClientConfig, IssuerConfig};
use crate::metadata::TokenType;
use crate::request::token::{TokenRequestError, TokenResponse, TokenExchangeGrantRequest};

use super::{AccessToken, RefreshToken};

/// A subject or actor token classified by its declared type.
///
/// Access and refresh tokens are resolved against storage and known to be
/// active. Every other type is carried as the raw value for the host to
/// validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangedToken {
    /// An active access token issued by this engine.
    AccessToken(AccessToken),
    /// An active refresh token issued by this engine.
    RefreshToken(RefreshToken),
    /// An unvalidated ID token.
    IdToken(String),
    /// An unvalidated SAML 1.1 assertion.
    Saml1(String),
    /// An unvalidated SAML 2.0 assertion.
    Saml2(String),
    /// An unvalidated JWT.
    Jwt(String),
}

impl ExchangedToken {
    /// Declared type of the token.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::AccessToken(_) => TokenType::AccessToken,
            Self::RefreshToken(_) => TokenType::RefreshToken,
            Self::IdToken(_) => TokenType::IdToken,
            Self::Saml1(_) => TokenType::Saml1,
            Self::Saml2(_) => TokenType::Saml2,
            Self::Jwt(_) => TokenType::Jwt,
        }
    }
}

/// The token representing the party on whose behalf the request is made.
pub type SubjectToken = ExchangedToken;

/// The token representing the acting party.
pub type ActorToken = ExchangedToken;

/// Everything the engine knows about a validated token exchange request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenExchangeRequestData {
    /// The authenticated client.
    pub client: ClientConfig,
    /// The parsed request.
    pub request: TokenExchangeGrantRequest,
    /// The classified subject token.
    pub subject_token: SubjectToken,
    /// The classified actor token, if one was sent.
    pub actor_token: Option<ActorToken>,
}

/// Mints the token returned from a token exchange.
#[async_trait]
pub trait SecurityTokenGenerator: Send + Sync {
    /// Issues a token for `data` under `issuer`.
    ///
    /// # Errors
    ///
    /// Returns a token endpoint error when the exchange is refused.
    async fn generate(
        &self,
        issuer: &IssuerConfig,
        data: TokenExchangeRequestData,
    ) -> Result<TokenResponse, TokenRequestError>;
}

/// Generator that refuses every exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSecurityTokenGenerator;

#[async_trait]
impl SecurityTokenGenerator for UnsupportedSecurityTokenGenerator {
    async fn generate(
        &self,
        issuer: &IssuerConfig,
        data: TokenExchangeRequestData,
    ) -> Result<TokenResponse, TokenRequestError> {
        tracing::debug!(
            issuer = %issuer.issuer,
            client_id = %data.client.id,
            "Token exchange refused, no security token generator configured"
        );
        Err(TokenRequestError::unsupported_grant_type(
            "Unsupported grant type.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;
    use crate::metadata::GrantType;
    use crate::request::token::TokenErrorCode;

    #[tokio::test]
    async fn test_default_generator_refuses() {
        let data = TokenExchangeRequestData {
            client: ClientConfig::new("gateway", "secret", ClientType::Confidential),
            request: TokenExchangeGrantRequest {
                grant_type: GrantType::TokenExchange,
                resource: None,
                audience: None,
                scope: None,
                requested_token_type: None,
                subject_token: "jwt".to_string(),
                subject_token_type: TokenType::Jwt,
                actor_token: None,
                actor_token_type: None,
            },
            subject_token: ExchangedToken::Jwt("jwt".to_string()),
            actor_token: None,
        };

        let result = UnsupportedSecurityTokenGenerator
            .generate(&IssuerConfig::new("http://localhost"), data)
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::UnsupportedGrantType));
        assert_eq!(error.description(), Some("Unsupported grant type."));
    }

    #[test]
    fn test_token_type_classification() {
        assert_eq!(
            ExchangedToken::Saml2("assertion".to_string()).token_type(),
            TokenType::Saml2
        );
        assert_eq!(
            ExchangedToken::IdToken("jwt".to_string()).token_type(),
            TokenType::IdToken
        );
    }
}
