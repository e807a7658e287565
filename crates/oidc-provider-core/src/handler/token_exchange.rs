//! Token exchange grant (RFC 8693).

use std::sync::Arc;

use crate::authorization::{ExchangedToken, SecurityTokenGenerator, TokenExchangeRequestData};
use crate::client_auth::ClientAuthenticationManager;
use crate::clock::Clock;
use crate::config::IssuerConfig;
use crate::http::HttpRequest;
use crate::metadata::TokenType;
use crate::provider::ProviderConfig;
use crate::request::token::{TokenExchangeGrantRequest, TokenRequestError, TokenResponse};
use crate::storage::{AccessTokenStorage, RefreshTokenStorage};

use super::authenticate_required;

/// Validates a token exchange request and hands it to the configured
/// [`SecurityTokenGenerator`].
///
/// Access and refresh tokens issued by this engine are resolved and must be
/// active. Other token types are passed through unvalidated.
#[derive(Clone)]
pub struct TokenExchangeGrantHandler {
    client_authentication: ClientAuthenticationManager,
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    clock: Arc<dyn Clock>,
    security_token_generator: Arc<dyn SecurityTokenGenerator>,
}

impl TokenExchangeGrantHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client_authentication: config.client_authentication.clone(),
            access_tokens: config.access_tokens.clone(),
            refresh_tokens: config.refresh_tokens.clone(),
            clock: config.clock.clone(),
            security_token_generator: config.security_token_generator.clone(),
        }
    }

    /// Runs the grant.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when the client does not authenticate,
    /// `invalid_request` for an unknown or expired subject or actor token,
    /// and whatever the generator refuses with.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<TokenResponse, TokenRequestError> {
        let client = authenticate_required(&self.client_authentication, issuer, request).await?;
        let grant = TokenExchangeGrantRequest::parse(issuer, &client, request)?;

        let subject_token = self
            .classify(
                issuer,
                &grant.subject_token,
                grant.subject_token_type,
                "subject_token",
            )
            .await?;
        let actor_token = match &grant.actor_token {
            Some(token) => Some(
                self.classify(
                    issuer,
                    token,
                    grant.actor_token_type.unwrap_or(TokenType::AccessToken),
                    "actor_token",
                )
                .await?,
            ),
            None => None,
        };

        tracing::debug!(
            issuer = %issuer.issuer,
            client_id = %client.id,
            subject_token_type = %grant.subject_token_type.as_str(),
            "Token exchange request validated"
        );

        let data = TokenExchangeRequestData {
            client,
            request: grant,
            subject_token,
            actor_token,
        };
        self.security_token_generator.generate(issuer, data).await
    }

    async fn classify(
        &self,
        issuer: &IssuerConfig,
        token: &str,
        token_type: TokenType,
        parameter: &str,
    ) -> Result<ExchangedToken, TokenRequestError> {
        let now = self.clock.epoch_second();

        match token_type {
            TokenType::AccessToken => {
                let found = self
                    .access_tokens
                    .find_by_token(&issuer.issuer, token)
                    .await?
                    .ok_or_else(|| invalid_token(parameter))?;
                if found.is_expired(now) {
                    return Err(expired_token(parameter));
                }
                Ok(ExchangedToken::AccessToken(found))
            }
            TokenType::RefreshToken => {
                let found = self
                    .refresh_tokens
                    .find_by_token(&issuer.issuer, token)
                    .await?
                    .ok_or_else(|| invalid_token(parameter))?;
                if found.is_expired(now) {
                    return Err(expired_token(parameter));
                }
                Ok(ExchangedToken::RefreshToken(found))
            }
            TokenType::IdToken => Ok(ExchangedToken::IdToken(token.to_string())),
            TokenType::Saml1 => Ok(ExchangedToken::Saml1(token.to_string())),
            TokenType::Saml2 => Ok(ExchangedToken::Saml2(token.to_string())),
            TokenType::Jwt => Ok(ExchangedToken::Jwt(token.to_string())),
        }
    }
}

fn invalid_token(parameter: &str) -> TokenRequestError {
    TokenRequestError::invalid_request(format!("'{parameter}' is invalid."))
}

fn expired_token(parameter: &str) -> TokenRequestError {
    TokenRequestError::invalid_request(format!("'{parameter}' is expired."))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::metadata::AccessTokenType;
    use crate::request::token::TokenErrorCode;
    use crate::test_support::{Fixture, NOW, basic_auth};

    /// Records the validated request and answers with a fixed token.
    #[derive(Default)]
    struct RecordingGenerator {
        seen: Mutex<Option<TokenExchangeRequestData>>,
    }

    #[async_trait]
    impl SecurityTokenGenerator for RecordingGenerator {
        async fn generate(
            &self,
            _issuer: &IssuerConfig,
            data: TokenExchangeRequestData,
        ) -> Result<TokenResponse, TokenRequestError> {
            *self.seen.lock().unwrap() = Some(data);
            Ok(TokenResponse {
                access_token: "exchanged".to_string(),
                token_type: AccessTokenType::NA,
                expires_in: None,
                refresh_token: None,
                scope: None,
                id_token: None,
                issued_token_type: Some(TokenType::Jwt),
            })
        }
    }

    fn exchange_request(subject_token: &str, subject_token_type: TokenType) -> HttpRequest {
        HttpRequest::post()
            .with_form("grant_type", "urn:ietf:params:oauth:grant-type:token-exchange")
            .with_form("subject_token", subject_token)
            .with_form("subject_token_type", subject_token_type.as_str())
            .with_header("Authorization", basic_auth("foo", "secret"))
    }

    fn handler(fixture: &Fixture, generator: Arc<RecordingGenerator>) -> TokenExchangeGrantHandler {
        let config = fixture
            .config
            .clone()
            .with_security_token_generator(generator);
        TokenExchangeGrantHandler::new(&config)
    }

    #[tokio::test]
    async fn test_active_access_token_is_resolved() {
        let fixture = Fixture::new();
        fixture
            .config
            .access_tokens
            .save(&fixture.access_token("bar", "at1", NOW + 60))
            .await
            .unwrap();
        let generator = Arc::new(RecordingGenerator::default());
        let handler = handler(&fixture, generator.clone());

        let response = handler
            .handle(
                &fixture.issuer,
                &exchange_request("at1", TokenType::AccessToken)
                    .with_form("actor_token", "actor-jwt")
                    .with_form("actor_token_type", TokenType::Jwt.as_str()),
            )
            .await
            .unwrap();
        assert_eq!(response.access_token, "exchanged");

        let seen = generator.seen.lock().unwrap().take().unwrap();
        assert_eq!(seen.client.id, "foo");
        assert!(matches!(
            seen.subject_token,
            ExchangedToken::AccessToken(ref token) if token.client_id == "bar"
        ));
        assert_eq!(
            seen.actor_token,
            Some(ExchangedToken::Jwt("actor-jwt".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_or_expired_subject_token() {
        let fixture = Fixture::new();
        fixture
            .config
            .refresh_tokens
            .save(&fixture.refresh_token("foo", "rt1", NOW - 1))
            .await
            .unwrap();
        let handler = handler(&fixture, Arc::new(RecordingGenerator::default()));

        let error = handler
            .handle(
                &fixture.issuer,
                &exchange_request("missing", TokenType::AccessToken),
            )
            .await
            .unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::InvalidRequest));
        assert_eq!(error.description(), Some("'subject_token' is invalid."));

        let error = handler
            .handle(
                &fixture.issuer,
                &exchange_request("rt1", TokenType::RefreshToken),
            )
            .await
            .unwrap_err();
        assert_eq!(error.description(), Some("'subject_token' is expired."));
    }

    #[tokio::test]
    async fn test_actor_token_is_validated() {
        let fixture = Fixture::new();
        fixture
            .config
            .access_tokens
            .save(&fixture.access_token("foo", "at1", NOW + 60))
            .await
            .unwrap();
        let handler = handler(&fixture, Arc::new(RecordingGenerator::default()));

        let request = exchange_request("at1", TokenType::AccessToken)
            .with_form("actor_token", "unknown-actor")
            .with_form("actor_token_type", TokenType::AccessToken.as_str());
        let error = handler.handle(&fixture.issuer, &request).await.unwrap_err();
        assert_eq!(error.description(), Some("'actor_token' is invalid."));
    }

    #[tokio::test]
    async fn test_default_generator_refuses() {
        let fixture = Fixture::new();
        let handler = TokenExchangeGrantHandler::new(&fixture.config);

        let error = handler
            .handle(&fixture.issuer, &exchange_request("jwt", TokenType::Jwt))
            .await
            .unwrap_err();
        assert_eq!(error.code(), Some(TokenErrorCode::UnsupportedGrantType));
    }
}
