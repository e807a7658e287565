//! Authorization code grant (RFC 6749 §4.1.3, RFC 7636 §4.6).

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

use crate::authentication::IdTokenGenerator;
use crate::authorization::{
    AccessTokenGenerator, AuthorizationCode, OFFLINE_ACCESS_SCOPE, RefreshTokenGenerator,
};
use crate::client_auth::ClientAuthenticationManager;
use crate::clock::Clock;
use crate::config::{ClientConfig, IssuerConfig};
use crate::http::HttpRequest;
use crate::metadata::PkceCodeChallengeMethod;
use crate::provider::ProviderConfig;
use crate::request::authorization::AuthorizationRequest;
use crate::request::token::{AuthorizationCodeGrantRequest, TokenRequestError, TokenResponse};
use crate::storage::{
    AccessTokenStorage, AuthorizationCodeStorage, ClientConfigStorage, RefreshTokenStorage,
};
use crate::token_generator::constant_time_eq;

use super::{authenticate_optional, verify_client_identity};

/// Exchanges an authorization code for tokens.
#[derive(Clone)]
pub struct AuthorizationCodeGrantHandler {
    client_authentication: ClientAuthenticationManager,
    clients: Arc<dyn ClientConfigStorage>,
    codes: Arc<dyn AuthorizationCodeStorage>,
    access_tokens: Arc<dyn AccessTokenStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    clock: Arc<dyn Clock>,
    access_token_generator: AccessTokenGenerator,
    refresh_token_generator: RefreshTokenGenerator,
    id_token_generator: IdTokenGenerator,
}

impl AuthorizationCodeGrantHandler {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client_authentication: config.client_authentication.clone(),
            clients: config.clients.clone(),
            codes: config.authorization_codes.clone(),
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
            id_token_generator: IdTokenGenerator::new(
                config.jwks.clone(),
                config.user_claims.clone(),
                config.clock.clone(),
            ),
        }
    }

    /// Runs the grant.
    ///
    /// The code is consumed once every check has passed, so a replayed code
    /// fails with `invalid_grant`. A refresh token is issued only when the
    /// code's scope contains `offline_access`; an ID token only when the
    /// authorization request was an OpenID Connect request.
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
        let grant = AuthorizationCodeGrantRequest::parse(issuer, request)?;

        let code = self
            .codes
            .find_by_code(&issuer.issuer, &grant.code)
            .await?
            .ok_or_else(|| TokenRequestError::invalid_grant("Authorization code is invalid."))?;
        self.verify_code(&grant, &code)?;

        let client = self
            .verify_client(issuer, &grant, &code, authenticated.as_ref())
            .await?;
        verify_pkce(&code.authorization_request, grant.code_verifier.as_deref()).inspect_err(
            |_| {
                tracing::warn!(issuer = %issuer.issuer, client_id = %client.id, "PKCE verification failed");
            },
        )?;

        if !self.codes.delete(&issuer.issuer, &code.code).await? {
            // Lost a race with a concurrent exchange of the same code.
            return Err(TokenRequestError::invalid_grant(
                "Authorization code is invalid.",
            ));
        }

        let scope = code.authorization_request.scope.clone();
        let subject = Some(code.subject.clone());

        let access_token =
            self.access_token_generator
                .generate(issuer, &client, scope.clone(), subject.clone());
        self.access_tokens.save(&access_token).await?;

        let refresh_token = if code.authorization_request.has_scope(OFFLINE_ACCESS_SCOPE) {
            let token = self
                .refresh_token_generator
                .generate(issuer, &client, scope.clone(), subject);
            self.refresh_tokens.save(&token).await?;
            Some(token.token)
        } else {
            None
        };

        let id_token = match &code.authentication_request {
            Some(authentication_request) => Some(
                self.id_token_generator
                    .generate(
                        issuer,
                        &client,
                        authentication_request,
                        Some(&access_token.token),
                        Some(&code.code),
                        &code.subject,
                    )
                    .await?,
            ),
            None => None,
        };

        tracing::debug!(
            issuer = %issuer.issuer,
            client_id = %client.id,
            grant_type = "authorization_code",
            refresh_token = refresh_token.is_some(),
            id_token = id_token.is_some(),
            "Tokens issued"
        );

        Ok(TokenResponse {
            access_token: access_token.token,
            token_type: access_token.token_type,
            expires_in: Some(access_token.expires_in),
            refresh_token,
            scope,
            id_token,
            issued_token_type: None,
        })
    }

    fn verify_code(
        &self,
        grant: &AuthorizationCodeGrantRequest,
        code: &AuthorizationCode,
    ) -> Result<(), TokenRequestError> {
        if code.is_expired(self.clock.epoch_second()) {
            tracing::warn!(issuer = %code.issuer, client_id = %code.client_id, "Authorization code expired");
            return Err(TokenRequestError::invalid_grant(
                "Authorization code expired.",
            ));
        }

        if grant.redirect_uri.as_deref() != Some(code.authorization_request.redirect_uri.as_str()) {
            tracing::warn!(issuer = %code.issuer, client_id = %code.client_id, "Redirect URI mismatch");
            return Err(TokenRequestError::invalid_grant("Redirect URI is invalid."));
        }

        Ok(())
    }

    async fn verify_client(
        &self,
        issuer: &IssuerConfig,
        grant: &AuthorizationCodeGrantRequest,
        code: &AuthorizationCode,
        authenticated: Option<&ClientConfig>,
    ) -> Result<ClientConfig, TokenRequestError> {
        let client = self
            .clients
            .find_by_id(&issuer.issuer, &code.authorization_request.client_id)
            .await?
            .ok_or_else(|| TokenRequestError::invalid_grant("Unknown client."))?;

        if let Some(authenticated) = authenticated.filter(|a| a.id != client.id) {
            tracing::warn!(
                issuer = %issuer.issuer,
                client_id = %authenticated.id,
                owner = %client.id,
                "Authorization code presented by another client"
            );
            return Err(TokenRequestError::invalid_grant(
                "Authorization code is invalid.",
            ));
        }

        verify_client_identity(&client, authenticated, grant.client_id.as_deref())?;
        Ok(client)
    }
}

/// Returns `true` if `verifier` answers `challenge` under `method`
/// (RFC 7636 §4.6). A missing method means `plain`.
#[must_use]
pub fn verify_code_challenge(
    challenge: &str,
    method: Option<PkceCodeChallengeMethod>,
    verifier: &str,
) -> bool {
    match method {
        None | Some(PkceCodeChallengeMethod::Plain) => constant_time_eq(verifier, challenge),
        Some(PkceCodeChallengeMethod::S256) => {
            let computed = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
            constant_time_eq(&computed, challenge)
        }
    }
}

fn verify_pkce(
    request: &AuthorizationRequest,
    verifier: Option<&str>,
) -> Result<(), TokenRequestError> {
    let Some(challenge) = request.code_challenge.as_deref() else {
        return Ok(());
    };
    let Some(verifier) = verifier else {
        return Err(TokenRequestError::invalid_request(
            "'code_verifier' is required.",
        ));
    };

    if verify_code_challenge(challenge, request.code_challenge_method, verifier) {
        Ok(())
    } else {
        Err(TokenRequestError::invalid_grant("'code_challenge' is invalid."))
    }
}
