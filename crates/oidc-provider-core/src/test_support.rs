//! Shared fixture for handler tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::authentication::{StandardClaim, UserClaimSet};
use crate::authorization::{AccessToken, RefreshToken};
use crate::clock::FixedClock;
use crate::config::{ClientConfig, ClientType, IssuerConfig};
use crate::jwk::{JwkConfig, SigningKeyPair};
use crate::metadata::{AccessTokenType, GrantType, PkceCodeChallengeMethod, ResponseType};
use crate::provider::{Provider, ProviderConfig};
use crate::storage::memory::MemoryStorage;
use crate::token_generator::TokenGenerator;

pub(crate) const ISSUER: &str = "http://localhost";
pub(crate) const REDIRECT_URI: &str = "http://localhost/cb";
pub(crate) const NOW: i64 = 1_700_000_000;

/// Yields `token-1`, `token-2`, ...
#[derive(Debug, Default)]
pub(crate) struct SequenceTokenGenerator {
    next: AtomicU64,
}

impl TokenGenerator for SequenceTokenGenerator {
    fn generate(&self, _size: usize) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("token-{n}")
    }
}

pub(crate) fn basic_auth(client_id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{secret}")))
}

/// In-memory provider with one issuer and three clients:
///
/// - `foo` / `secret`: confidential, every grant
/// - `bar` / `secret`: confidential, every grant
/// - `pub`: public, code and refresh grants
pub(crate) struct Fixture {
    pub clock: Arc<FixedClock>,
    pub issuer: IssuerConfig,
    pub storage: MemoryStorage,
    pub config: ProviderConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let issuer = IssuerConfig::new(ISSUER)
            .with_scopes(["openid", "read", "write", "offline_access"])
            .with_response_types(vec![
                ResponseType::Code,
                ResponseType::Token,
                ResponseType::IdToken,
            ])
            .with_grant_types(vec![
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::ClientCredentials,
                GrantType::TokenExchange,
            ])
            .with_code_challenge_methods(vec![
                PkceCodeChallengeMethod::S256,
                PkceCodeChallengeMethod::Plain,
            ]);

        let storage = MemoryStorage::new();
        storage.issuers.insert(issuer.clone());
        storage.clients.insert(ISSUER, confidential_client("foo"));
        storage.clients.insert(ISSUER, confidential_client("bar"));
        storage.clients.insert(ISSUER, public_client());
        storage.jwks.insert(
            ISSUER,
            JwkConfig::primary(SigningKeyPair::generate_ec().expect("EC key generation")),
        );
        storage.user_claims.insert(
            ISSUER,
            "alice",
            UserClaimSet::new(StandardClaim {
                name: Some("Alice".to_string()),
                email: Some("alice@example.com".to_string()),
                ..StandardClaim::default()
            }),
        );

        let clock = Arc::new(FixedClock::new(NOW));
        let config = storage
            .provider_config()
            .with_clock(clock.clone())
            .with_token_generator(Arc::new(SequenceTokenGenerator::default()));

        Self {
            clock,
            issuer,
            storage,
            config,
        }
    }

    pub fn provider(&self) -> Provider {
        Provider::new(self.config.clone())
    }

    pub fn client(&self, id: &str) -> ClientConfig {
        if id == "pub" {
            public_client()
        } else {
            confidential_client(id)
        }
    }

    pub fn access_token(&self, client_id: &str, token: &str, expires_at: i64) -> AccessToken {
        AccessToken {
            issuer: ISSUER.to_string(),
            client_id: client_id.to_string(),
            subject: Some("alice".to_string()),
            token: token.to_string(),
            token_type: AccessTokenType::Bearer,
            expires_in: 3600,
            expires_at,
            issued_at: expires_at - 3600,
            scope: Some(vec!["read".to_string(), "write".to_string()]),
        }
    }

    pub fn refresh_token(&self, client_id: &str, token: &str, expires_at: i64) -> RefreshToken {
        RefreshToken {
            issuer: ISSUER.to_string(),
            client_id: client_id.to_string(),
            subject: Some("alice".to_string()),
            token: token.to_string(),
            token_type: AccessTokenType::Bearer,
            expires_in: 3600,
            expires_at,
            issued_at: expires_at - 3600,
            scope: Some(vec![
                "read".to_string(),
                "write".to_string(),
                "offline_access".to_string(),
            ]),
        }
    }
}

fn confidential_client(id: &str) -> ClientConfig {
    ClientConfig::new(id, "secret", ClientType::Confidential)
        .with_scopes(["openid", "read", "write", "offline_access"])
        .with_grant_types(vec![
            GrantType::AuthorizationCode,
            GrantType::RefreshToken,
            GrantType::ClientCredentials,
            GrantType::TokenExchange,
        ])
        .with_redirect_uris([REDIRECT_URI])
}

fn public_client() -> ClientConfig {
    ClientConfig::new("pub", "", ClientType::Public)
        .with_scopes(["openid", "read", "offline_access"])
        .with_grant_types(vec![GrantType::AuthorizationCode, GrantType::RefreshToken])
        .with_redirect_uris([REDIRECT_URI])
}
