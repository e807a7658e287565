//! Token introspection (RFC 7662).

use std::sync::Arc;

use crate::client_auth::{ClientAuthenticationError, ClientAuthenticationManager};
use crate::clock::Clock;
use crate::config::IssuerConfig;
use crate::http::HttpRequest;
use crate::provider::ProviderConfig;
use crate::request::introspection::{
    IntrospectionErrorCode, IntrospectionRequest, IntrospectionRequestError,
    IntrospectionResponse,
};
use crate::storage::{AccessTokenStorage, RefreshTokenStorage};

use super::{StoredToken, find_token};

/// Answers introspection requests from authenticated clients.
///
/// Unknown and expired tokens are reported as inactive, never as errors.
#[derive(Clone)]
pub struct IntrospectionRequestHandler {
    client_authentication: ClientAuthenticationManager,
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    clock: Arc<dyn Clock>,
}

impl IntrospectionRequestHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client_authentication: config.client_authentication.clone(),
            access_tokens: config.access_tokens.clone(),
            refresh_tokens: config.refresh_tokens.clone(),
            clock: config.clock.clone(),
        }
    }

    /// Introspects the token in `request`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_client` when the caller does not authenticate and
    /// `invalid_request` for a malformed body.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<IntrospectionResponse, IntrospectionRequestError> {
        let client = match self.client_authentication.authenticate(issuer, request).await {
            Ok(client) => client,
            Err(ClientAuthenticationError::InvalidCredentials) => {
                return Err(invalid_client(Some("Invalid credentials.".to_string())));
            }
            Err(ClientAuthenticationError::InvalidRequest { description }) => {
                return Err(invalid_client(description));
            }
            Err(ClientAuthenticationError::UnmatchedAuthenticationMethod) => {
                return Err(invalid_client(Some(
                    "Client authentication is required.".to_string(),
                )));
            }
            Err(ClientAuthenticationError::Provider(e)) => return Err(e.into()),
        };
        let introspection = IntrospectionRequest::parse(request)?;

        let found = find_token(
            self.access_tokens.as_ref(),
            self.refresh_tokens.as_ref(),
            &issuer.issuer,
            &introspection.token,
            introspection.token_type_hint,
        )
        .await?;

        let Some(found) = found.filter(|t| !t.is_expired(self.clock.epoch_second())) else {
            tracing::debug!(issuer = %issuer.issuer, client_id = %client.id, "Introspected token is inactive");
            return Ok(IntrospectionResponse::inactive());
        };

        let response = match found {
            StoredToken::Access(token) => IntrospectionResponse {
                active: true,
                scope: token.scope_string(),
                client_id: Some(token.client_id),
                token_type: Some(token.token_type),
                exp: Some(token.expires_at),
                iat: Some(token.issued_at),
                sub: token.subject,
                iss: Some(token.issuer),
                ..IntrospectionResponse::default()
            },
            StoredToken::Refresh(token) => IntrospectionResponse {
                active: true,
                scope: token.scope_string(),
                client_id: Some(token.client_id),
                token_type: Some(token.token_type),
                exp: Some(token.expires_at),
                iat: Some(token.issued_at),
                sub: token.subject,
                iss: Some(token.issuer),
                ..IntrospectionResponse::default()
            },
        };
        Ok(response)
    }
}

fn invalid_client(description: Option<String>) -> IntrospectionRequestError {
    IntrospectionRequestError::ErrorResponse {
        error: IntrospectionErrorCode::InvalidClient,
        error_description: description,
        error_uri: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AccessTokenType;
    use crate::test_support::{Fixture, ISSUER, NOW, basic_auth};

    fn introspect(token: &str) -> HttpRequest {
        HttpRequest::post()
            .with_form("token", token)
            .with_header("Authorization", basic_auth("foo", "secret"))
    }

    #[tokio::test]
    async fn test_active_access_token() {
        let fixture = Fixture::new();
        fixture
            .config
            .access_tokens
            .save(&fixture.access_token("bar", "at1", NOW + 60))
            .await
            .unwrap();
        let handler = IntrospectionRequestHandler::new(&fixture.config);

        let response = handler
            .handle(&fixture.issuer, &introspect("at1"))
            .await
            .unwrap();
        assert!(response.active);
        assert_eq!(response.scope.as_deref(), Some("read write"));
        assert_eq!(response.client_id.as_deref(), Some("bar"));
        assert_eq!(response.token_type, Some(AccessTokenType::Bearer));
        assert_eq!(response.exp, Some(NOW + 60));
        assert_eq!(response.sub.as_deref(), Some("alice"));
        assert_eq!(response.iss.as_deref(), Some(ISSUER));
    }

    #[tokio::test]
    async fn test_refresh_token_with_hint() {
        let fixture = Fixture::new();
        fixture
            .config
            .refresh_tokens
            .save(&fixture.refresh_token("foo", "rt1", NOW + 60))
            .await
            .unwrap();
        let handler = IntrospectionRequestHandler::new(&fixture.config);

        let request = introspect("rt1").with_form("token_type_hint", "refresh_token");
        let response = handler.handle(&fixture.issuer, &request).await.unwrap();
        assert!(response.active);
        assert_eq!(response.scope.as_deref(), Some("read write offline_access"));

        // A wrong hint still finds the token in the other store.
        let request = introspect("rt1").with_form("token_type_hint", "access_token");
        let response = handler.handle(&fixture.issuer, &request).await.unwrap();
        assert!(response.active);
    }

    #[tokio::test]
    async fn test_unknown_and_expired_tokens_are_inactive() {
        let fixture = Fixture::new();
        fixture
            .config
            .access_tokens
            .save(&fixture.access_token("foo", "at1", NOW - 1))
            .await
            .unwrap();
        let handler = IntrospectionRequestHandler::new(&fixture.config);

        for token in ["at1", "missing"] {
            let response = handler
                .handle(&fixture.issuer, &introspect(token))
                .await
                .unwrap();
            assert_eq!(response, IntrospectionResponse::inactive());
        }
    }

    #[tokio::test]
    async fn test_client_authentication_required() {
        let fixture = Fixture::new();
        let handler = IntrospectionRequestHandler::new(&fixture.config);

        let request = HttpRequest::post().with_form("token", "at1");
        let error = handler.handle(&fixture.issuer, &request).await.unwrap_err();
        assert_eq!(error.code(), Some(IntrospectionErrorCode::InvalidClient));
        assert_eq!(error.description(), Some("Client authentication is required."));
        assert_eq!(error.http_status(), 401);

        let request = HttpRequest::post()
            .with_form("token", "at1")
            .with_header("Authorization", basic_auth("foo", "wrong"));
        let error = handler.handle(&fixture.issuer, &request).await.unwrap_err();
        assert_eq!(error.description(), Some("Invalid credentials."));
    }

    #[tokio::test]
    async fn test_missing_token_parameter() {
        let fixture = Fixture::new();
        let handler = IntrospectionRequestHandler::new(&fixture.config);
        let request = HttpRequest::post().with_header("Authorization", basic_auth("foo", "secret"));

        let error = handler.handle(&fixture.issuer, &request).await.unwrap_err();
        assert_eq!(error.code(), Some(IntrospectionErrorCode::InvalidRequest));
    }
}
