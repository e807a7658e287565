//! Authorization endpoint, split around the host's login and consent UI.
//!
//! The pre-process step validates the request and stashes it under an opaque
//! key. The host authenticates the end user, asks for consent and calls the
//! post-process step with the key, the subject and the decision.

use std::sync::Arc;

use crate::authentication::IdTokenGenerator;
use crate::authorization::{AccessTokenGenerator, AuthorizationCodeGenerator};
use crate::clock::Clock;
use crate::config::IssuerConfig;
use crate::http::HttpRequest;
use crate::metadata::ResponseType;
use crate::provider::ProviderConfig;
use crate::request::authentication::AuthenticationRequest;
use crate::request::authorization::{
    AuthorizationRequestConverter, AuthorizationRequestData, AuthorizationRequestError,
    AuthorizationResponse, AuthorizationResponseCode, AuthorizationResponseError,
    AuthorizationResponseIdToken, AuthorizationResponseToken,
};
use crate::storage::{
    AccessTokenStorage, AuthorizationCodeStorage, AuthorizationRequestDataStorage,
    ClientConfigStorage,
};
use crate::token_generator::{DEFAULT_TOKEN_SIZE, TokenGenerator};

// =============================================================================
// Pre-process
// =============================================================================

/// Validates an authorization request and stashes it.
#[derive(Clone)]
pub struct AuthorizationRequestPreProcessHandler {
    converter: AuthorizationRequestConverter,
    data: Arc<dyn AuthorizationRequestDataStorage>,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
}

impl AuthorizationRequestPreProcessHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            converter: AuthorizationRequestConverter::new(config.clients.clone()),
            data: config.authorization_request_data.clone(),
            clock: config.clock.clone(),
            tokens: config.token_generator.clone(),
        }
    }

    /// Converts `request` and stashes the result.
    ///
    /// The returned record's `key` is what the host hands to its login and
    /// consent UI.
    ///
    /// # Errors
    ///
    /// Returns the converter's error, or `Provider` on storage failure.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<AuthorizationRequestData, AuthorizationRequestError> {
        let (authorization_request, client) = self.converter.convert(issuer, request).await?;
        let authentication_request = AuthenticationRequest::parse(&authorization_request, request)?;
        let duration = client.authorization_request_data_duration_for(issuer);

        let data = AuthorizationRequestData {
            issuer: issuer.issuer.clone(),
            key: self.tokens.generate(DEFAULT_TOKEN_SIZE),
            expires_at: self.clock.epoch_second() + duration,
            authorization_request,
            authentication_request,
        };
        self.data.save(&data).await?;

        tracing::debug!(
            issuer = %issuer.issuer,
            client_id = %data.authorization_request.client_id,
            openid = data.authentication_request.is_some(),
            "Authorization request stashed"
        );
        Ok(data)
    }
}

// =============================================================================
// Post-process
// =============================================================================

/// Completes a stashed authorization request.
#[derive(Clone)]
pub struct AuthorizationRequestPostProcessHandler {
    clients: Arc<dyn ClientConfigStorage>,
    data: Arc<dyn AuthorizationRequestDataStorage>,
    codes: Arc<dyn AuthorizationCodeStorage>,
    access_tokens: Arc<dyn AccessTokenStorage>,
    clock: Arc<dyn Clock>,
    access_token_generator: AccessTokenGenerator,
    code_generator: AuthorizationCodeGenerator,
    id_token_generator: IdTokenGenerator,
}

impl AuthorizationRequestPostProcessHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            clients: config.clients.clone(),
            data: config.authorization_request_data.clone(),
            codes: config.authorization_codes.clone(),
            access_tokens: config.access_tokens.clone(),
            clock: config.clock.clone(),
            access_token_generator: AccessTokenGenerator::new(
                config.clock.clone(),
                config.token_generator.clone(),
            ),
            code_generator: AuthorizationCodeGenerator::new(
                config.clock.clone(),
                config.token_generator.clone(),
            ),
            id_token_generator: IdTokenGenerator::new(
                config.jwks.clone(),
                config.user_claims.clone(),
                config.clock.clone(),
            ),
        }
    }

    /// Answers the request stashed under `key` for the authenticated
    /// `subject`.
    ///
    /// With consent, issues whatever the request's `response_type` asked
    /// for. The stash is deleted either way.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the key is unknown or expired or its
    /// client no longer exists, and an `access_denied` error response when
    /// `consent` is `false`.
    pub async fn handle(
        &self,
        issuer: &IssuerConfig,
        subject: &str,
        key: &str,
        consent: bool,
    ) -> Result<AuthorizationResponse, AuthorizationResponseError> {
        let Some(data) = self.data.find_by_key(&issuer.issuer, key).await? else {
            tracing::warn!(issuer = %issuer.issuer, "Unknown authorization request key");
            return Err(AuthorizationResponseError::InvalidRequest);
        };
        if data.is_expired(self.clock.epoch_second()) {
            tracing::warn!(issuer = %issuer.issuer, "Authorization request expired");
            return Err(AuthorizationResponseError::InvalidRequest);
        }

        let request = &data.authorization_request;
        let Some(client) = self
            .clients
            .find_by_id(&issuer.issuer, &request.client_id)
            .await?
        else {
            return Err(AuthorizationResponseError::InvalidRequest);
        };

        if !consent {
            self.data.delete(&issuer.issuer, key).await?;
            tracing::warn!(
                issuer = %issuer.issuer,
                client_id = %client.id,
                "Authorization denied by end user"
            );
            return Err(AuthorizationResponseError::access_denied(
                request.redirect_uri.clone(),
                request.state.clone(),
            ));
        }

        let access_token = if request.requests(ResponseType::Token) {
            let token = self.access_token_generator.generate(
                issuer,
                &client,
                request.scope.clone(),
                Some(subject.to_string()),
            );
            self.access_tokens.save(&token).await?;
            Some(token)
        } else {
            None
        };

        let code = if request.requests(ResponseType::Code) {
            let code = self.code_generator.generate(
                issuer,
                &client,
                request.clone(),
                data.authentication_request.clone(),
                subject,
            );
            self.codes.save(&code).await?;
            Some(code)
        } else {
            None
        };

        let id_token = match &data.authentication_request {
            Some(authentication_request) if request.requests(ResponseType::IdToken) => Some(
                self.id_token_generator
                    .generate(
                        issuer,
                        &client,
                        authentication_request,
                        access_token.as_ref().map(|token| token.token.as_str()),
                        code.as_ref().map(|code| code.code.as_str()),
                        subject,
                    )
                    .await?,
            ),
            _ => None,
        };

        self.data.delete(&issuer.issuer, key).await?;

        tracing::debug!(
            issuer = %issuer.issuer,
            client_id = %client.id,
            code = code.is_some(),
            access_token = access_token.is_some(),
            id_token = id_token.is_some(),
            "Authorization request completed"
        );

        Ok(AuthorizationResponse {
            token: access_token.map(|token| AuthorizationResponseToken {
                scope: token.scope_string(),
                access_token: token.token,
                token_type: token.token_type,
                expires_in: Some(token.expires_in),
            }),
            code: code.map(|code| AuthorizationResponseCode { code: code.code }),
            id_token: id_token.map(|id_token| AuthorizationResponseIdToken { id_token }),
            redirect_uri: data.authorization_request.redirect_uri,
            response_type: data.authorization_request.response_type,
            response_mode: data.authorization_request.response_mode,
            state: data.authorization_request.state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{IdTokenClaims, left_half_hash};
    use crate::request::authorization::AuthorizationErrorCode;
    use crate::storage::JwkConfigStorage;
    use crate::test_support::{Fixture, ISSUER, REDIRECT_URI};

    fn authorization_request(response_type: &str, scope: &str) -> HttpRequest {
        HttpRequest::get()
            .with_query("response_type", response_type)
            .with_query("client_id", "foo")
            .with_query("redirect_uri", REDIRECT_URI)
            .with_query("scope", scope)
            .with_query("state", "xyz")
            .with_query("nonce", "n-0S6")
    }

    #[tokio::test]
    async fn test_pre_process_stashes_request() {
        let fixture = Fixture::new();
        let handler = AuthorizationRequestPreProcessHandler::new(&fixture.config);

        let data = handler
            .handle(&fixture.issuer, &authorization_request("code", "read"))
            .await
            .unwrap();

        assert_eq!(data.issuer, ISSUER);
        assert_eq!(
            data.expires_at,
            fixture.clock.epoch_second() + fixture.issuer.authorization_request_data_duration
        );
        assert!(data.authentication_request.is_none());
        assert_eq!(fixture.storage.authorization_request_data.len(), 1);
    }

    #[tokio::test]
    async fn test_pre_process_uses_client_lifetime() {
        let fixture = Fixture::new();
        let mut client = fixture.client("foo");
        client.authorization_request_data_duration = Some(30);
        fixture.storage.clients.insert(ISSUER, client);
        let handler = AuthorizationRequestPreProcessHandler::new(&fixture.config);

        let data = handler
            .handle(&fixture.issuer, &authorization_request("code", "read"))
            .await
            .unwrap();
        assert_eq!(data.expires_at, fixture.clock.epoch_second() + 30);
    }

    #[tokio::test]
    async fn test_pre_process_parses_openid_request() {
        let fixture = Fixture::new();
        let handler = AuthorizationRequestPreProcessHandler::new(&fixture.config);

        let data = handler
            .handle(&fixture.issuer, &authorization_request("code", "openid read"))
            .await
            .unwrap();

        let authentication_request = data.authentication_request.unwrap();
        assert_eq!(authentication_request.nonce.as_deref(), Some("n-0S6"));
    }

    #[tokio::test]
    async fn test_pre_process_rejects_unknown_client() {
        let fixture = Fixture::new();
        let handler = AuthorizationRequestPreProcessHandler::new(&fixture.config);
        let request = HttpRequest::get()
            .with_query("response_type", "code")
            .with_query("client_id", "nobody")
            .with_query("redirect_uri", REDIRECT_URI);

        let result = handler.handle(&fixture.issuer, &request).await;
        assert!(matches!(
            result,
            Err(AuthorizationRequestError::InvalidClient { .. })
        ));
        assert!(fixture.storage.authorization_request_data.is_empty());
    }

    #[tokio::test]
    async fn test_post_process_issues_code() {
        let fixture = Fixture::new();
        let pre = AuthorizationRequestPreProcessHandler::new(&fixture.config);
        let post = AuthorizationRequestPostProcessHandler::new(&fixture.config);

        let data = pre
            .handle(&fixture.issuer, &authorization_request("code", "read"))
            .await
            .unwrap();
        let response = post
            .handle(&fixture.issuer, "alice", &data.key, true)
            .await
            .unwrap();

        assert!(response.token.is_none());
        assert!(response.id_token.is_none());
        assert_eq!(response.redirect_uri, REDIRECT_URI);
        assert_eq!(response.state.as_deref(), Some("xyz"));

        let code = response.code.unwrap().code;
        let stored = fixture
            .config
            .authorization_codes
            .find_by_code(ISSUER, &code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.subject, "alice");
        assert!(fixture.storage.authorization_request_data.is_empty());
    }

    #[tokio::test]
    async fn test_post_process_hybrid_response() {
        let fixture = Fixture::new();
        let pre = AuthorizationRequestPreProcessHandler::new(&fixture.config);
        let post = AuthorizationRequestPostProcessHandler::new(&fixture.config);

        let data = pre
            .handle(
                &fixture.issuer,
                &authorization_request("code token id_token", "openid read"),
            )
            .await
            .unwrap();
        let response = post
            .handle(&fixture.issuer, "alice", &data.key, true)
            .await
            .unwrap();

        let token = response.token.unwrap();
        assert_eq!(token.scope.as_deref(), Some("openid read"));
        let code = response.code.unwrap().code;
        let id_token = response.id_token.unwrap().id_token;

        let key = fixture.config.jwks.find_primary(ISSUER).await.unwrap().unwrap();
        let claims = key
            .key
            .verify::<IdTokenClaims>(&id_token, ISSUER, "foo")
            .unwrap()
            .claims;
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.nonce.as_deref(), Some("n-0S6"));
        assert_eq!(
            claims.at_hash,
            Some(left_half_hash(key.algorithm(), &token.access_token))
        );
        assert_eq!(
            claims.c_hash,
            Some(left_half_hash(key.algorithm(), &code))
        );
    }

    #[tokio::test]
    async fn test_post_process_denied() {
        let fixture = Fixture::new();
        let pre = AuthorizationRequestPreProcessHandler::new(&fixture.config);
        let post = AuthorizationRequestPostProcessHandler::new(&fixture.config);

        let data = pre
            .handle(&fixture.issuer, &authorization_request("code", "read"))
            .await
            .unwrap();
        let error = post
            .handle(&fixture.issuer, "alice", &data.key, false)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            AuthorizationResponseError::ErrorResponse {
                error: AuthorizationErrorCode::AccessDenied,
                ref redirect_uri,
                ref state,
                ..
            } if redirect_uri == REDIRECT_URI && state.as_deref() == Some("xyz")
        ));
        assert!(fixture.storage.authorization_request_data.is_empty());
    }

    #[tokio::test]
    async fn test_post_process_unknown_or_expired_key() {
        let fixture = Fixture::new();
        let pre = AuthorizationRequestPreProcessHandler::new(&fixture.config);
        let post = AuthorizationRequestPostProcessHandler::new(&fixture.config);

        let result = post.handle(&fixture.issuer, "alice", "missing", true).await;
        assert!(matches!(result, Err(AuthorizationResponseError::InvalidRequest)));

        let data = pre
            .handle(&fixture.issuer, &authorization_request("code", "read"))
            .await
            .unwrap();
        fixture
            .clock
            .advance(fixture.issuer.authorization_request_data_duration + 1);

        let result = post.handle(&fixture.issuer, "alice", &data.key, true).await;
        assert!(matches!(result, Err(AuthorizationResponseError::InvalidRequest)));
    }
}
