//! Credential generators.
//!
//! Lifetimes come from the client's override when set, else from the
//! issuer's default. Values come from the injected [`TokenGenerator`].

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{ClientConfig, IssuerConfig};
use crate::metadata::AccessTokenType;
use crate::request::authentication::AuthenticationRequest;
use crate::request::authorization::AuthorizationRequest;
use crate::token_generator::{DEFAULT_TOKEN_SIZE, TokenGenerator};

use super::{AccessToken, AuthorizationCode, RefreshToken};

/// Issues bearer access tokens.
#[derive(Clone)]
pub struct AccessTokenGenerator {
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
}

impl AccessTokenGenerator {
    /// Creates a generator.
    pub fn new(clock: Arc<dyn Clock>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { clock, tokens }
    }

    /// Issues a token for `client` with `scope` on behalf of `subject`.
    pub fn generate(
        &self,
        issuer: &IssuerConfig,
        client: &ClientConfig,
        scope: Option<Vec<String>>,
        subject: Option<String>,
    ) -> AccessToken {
        let expires_in = client.access_token_duration_for(issuer);
        let issued_at = self.clock.epoch_second();

        AccessToken {
            issuer: issuer.issuer.clone(),
            client_id: client.id.clone(),
            subject,
            token: self.tokens.generate(DEFAULT_TOKEN_SIZE),
            token_type: AccessTokenType::Bearer,
            expires_in,
            expires_at: issued_at + expires_in,
            issued_at,
            scope,
        }
    }
}

/// Issues refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenGenerator {
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
}

impl RefreshTokenGenerator {
    /// Creates a generator.
    pub fn new(clock: Arc<dyn Clock>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { clock, tokens }
    }

    /// Issues a token for `client` with `scope` on behalf of `subject`.
    pub fn generate(
        &self,
        issuer: &IssuerConfig,
        client: &ClientConfig,
        scope: Option<Vec<String>>,
        subject: Option<String>,
    ) -> RefreshToken {
        let expires_in = client.refresh_token_duration_for(issuer);
        let issued_at = self.clock.epoch_second();

        RefreshToken {
            issuer: issuer.issuer.clone(),
            client_id: client.id.clone(),
            subject,
            token: self.tokens.generate(DEFAULT_TOKEN_SIZE),
            token_type: AccessTokenType::Bearer,
            expires_in,
            expires_at: issued_at + expires_in,
            issued_at,
            scope,
        }
    }
}

/// Issues authorization codes.
#[derive(Clone)]
pub struct AuthorizationCodeGenerator {
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
}

impl AuthorizationCodeGenerator {
    /// Creates a generator.
    pub fn new(clock: Arc<dyn Clock>, tokens: Arc<dyn TokenGenerator>) -> Self {
        Self { clock, tokens }
    }

    /// Issues a code answering `authorization_request` for `subject`.
    pub fn generate(
        &self,
        issuer: &IssuerConfig,
        client: &ClientConfig,
        authorization_request: AuthorizationRequest,
        authentication_request: Option<AuthenticationRequest>,
        subject: impl Into<String>,
    ) -> AuthorizationCode {
        AuthorizationCode {
            issuer: issuer.issuer.clone(),
            client_id: client.id.clone(),
            code: self.tokens.generate(DEFAULT_TOKEN_SIZE),
            expires_at: self.clock.epoch_second() + client.authorization_code_duration_for(issuer),
            subject: subject.into(),
            authorization_request,
            authentication_request,
        }
    }
}
