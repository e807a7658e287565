//! In-memory storage backed by `DashMap`.
//!
//! Suitable for tests, demos and single-process deployments. Nothing is
//! persisted and expired records are never swept.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{
    AccessTokenStorage, AuthorizationCodeStorage, AuthorizationRequestDataStorage,
    ClientConfigStorage, IssuerConfigStorage, JwkConfigStorage, RefreshTokenStorage,
    UserClaimSetStorage,
};
use crate::ProviderResult;
use crate::authentication::UserClaimSet;
use crate::authorization::{AccessToken, AuthorizationCode, RefreshToken};
use crate::config::{ClientConfig, IssuerConfig, ProviderSettings};
use crate::error::ProviderError;
use crate::jwk::JwkConfig;
use crate::provider::ProviderConfig;
use crate::request::authorization::AuthorizationRequestData;

/// Map keyed by (issuer, natural key).
#[derive(Debug)]
struct IssuerScoped<V> {
    entries: DashMap<(String, String), V>,
}

impl<V> Default for IssuerScoped<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> IssuerScoped<V> {
    fn key(issuer: &str, key: &str) -> (String, String) {
        (issuer.to_string(), key.to_string())
    }

    fn insert(&self, issuer: &str, key: &str, value: V) {
        self.entries.insert(Self::key(issuer, key), value);
    }

    fn insert_new(&self, kind: &str, issuer: &str, key: &str, value: V) -> ProviderResult<()> {
        match self.entries.entry(Self::key(issuer, key)) {
            Entry::Occupied(_) => Err(ProviderError::storage(format!(
                "{kind} already exists. [{issuer}]"
            ))),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    fn get(&self, issuer: &str, key: &str) -> Option<V> {
        self.entries
            .get(&Self::key(issuer, key))
            .map(|entry| entry.value().clone())
    }

    fn remove(&self, issuer: &str, key: &str) -> bool {
        self.entries.remove(&Self::key(issuer, key)).is_some()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// In-memory issuer registry.
#[derive(Debug, Default)]
pub struct MemoryIssuerConfigStorage {
    issuers: DashMap<String, IssuerConfig>,
}

impl MemoryIssuerConfigStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces an issuer.
    pub fn insert(&self, issuer: IssuerConfig) {
        self.issuers.insert(issuer.issuer.clone(), issuer);
    }
}

#[async_trait]
impl IssuerConfigStorage for MemoryIssuerConfigStorage {
    async fn find_by_issuer(&self, issuer: &str) -> ProviderResult<Option<IssuerConfig>> {
        Ok(self.issuers.get(issuer).map(|entry| entry.value().clone()))
    }
}

/// In-memory client registry.
#[derive(Debug, Default)]
pub struct MemoryClientConfigStorage {
    clients: IssuerScoped<ClientConfig>,
}

impl MemoryClientConfigStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a client of `issuer`.
    pub fn insert(&self, issuer: &str, client: ClientConfig) {
        let id = client.id.clone();
        self.clients.insert(issuer, &id, client);
    }
}

#[async_trait]
impl ClientConfigStorage for MemoryClientConfigStorage {
    async fn find_by_id(
        &self,
        issuer: &str,
        client_id: &str,
    ) -> ProviderResult<Option<ClientConfig>> {
        Ok(self.clients.get(issuer, client_id))
    }
}

/// In-memory signing key registry.
#[derive(Debug, Default)]
pub struct MemoryJwkConfigStorage {
    keys: DashMap<String, Vec<JwkConfig>>,
}

impl MemoryJwkConfigStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key for `issuer`.
    pub fn insert(&self, issuer: &str, jwk: JwkConfig) {
        self.keys.entry(issuer.to_string()).or_default().push(jwk);
    }
}

#[async_trait]
impl JwkConfigStorage for MemoryJwkConfigStorage {
    async fn find_by_issuer(&self, issuer: &str) -> ProviderResult<Vec<JwkConfig>> {
        Ok(self
            .keys
            .get(issuer)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

/// In-memory end-user claims.
#[derive(Debug, Default)]
pub struct MemoryUserClaimSetStorage {
    claims: IssuerScoped<UserClaimSet>,
}

impl MemoryUserClaimSetStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the claims of `subject`.
    pub fn insert(&self, issuer: &str, subject: &str, claims: UserClaimSet) {
        self.claims.insert(issuer, subject, claims);
    }
}

#[async_trait]
impl UserClaimSetStorage for MemoryUserClaimSetStorage {
    async fn find_by_subject(
        &self,
        issuer: &str,
        subject: &str,
    ) -> ProviderResult<Option<UserClaimSet>> {
        Ok(self.claims.get(issuer, subject))
    }
}

// =============================================================================
// Issued artifacts
// =============================================================================

/// In-memory stash of pending authorization requests.
#[derive(Debug, Default)]
pub struct MemoryAuthorizationRequestDataStorage {
    data: IssuerScoped<AuthorizationRequestData>,
}

impl MemoryAuthorizationRequestDataStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stashed requests across all issuers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing is stashed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuthorizationRequestDataStorage for MemoryAuthorizationRequestDataStorage {
    async fn save(&self, data: &AuthorizationRequestData) -> ProviderResult<()> {
        self.data
            .insert_new("Authorization request", &data.issuer, &data.key, data.clone())
    }

    async fn find_by_key(
        &self,
        issuer: &str,
        key: &str,
    ) -> ProviderResult<Option<AuthorizationRequestData>> {
        Ok(self.data.get(issuer, key))
    }

    async fn delete(&self, issuer: &str, key: &str) -> ProviderResult<bool> {
        Ok(self.data.remove(issuer, key))
    }
}

/// In-memory authorization codes.
#[derive(Debug, Default)]
pub struct MemoryAuthorizationCodeStorage {
    codes: IssuerScoped<AuthorizationCode>,
}

impl MemoryAuthorizationCodeStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MemoryAuthorizationCodeStorage {
    async fn save(&self, code: &AuthorizationCode) -> ProviderResult<()> {
        self.codes
            .insert_new("Authorization code", &code.issuer, &code.code, code.clone())
    }

    async fn find_by_code(
        &self,
        issuer: &str,
        code: &str,
    ) -> ProviderResult<Option<AuthorizationCode>> {
        Ok(self.codes.get(issuer, code))
    }

    async fn delete(&self, issuer: &str, code: &str) -> ProviderResult<bool> {
        Ok(self.codes.remove(issuer, code))
    }
}

/// In-memory access tokens.
#[derive(Debug, Default)]
pub struct MemoryAccessTokenStorage {
    tokens: IssuerScoped<AccessToken>,
}

impl MemoryAccessTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessTokenStorage for MemoryAccessTokenStorage {
    async fn save(&self, token: &AccessToken) -> ProviderResult<()> {
        self.tokens
            .insert_new("Access token", &token.issuer, &token.token, token.clone())
    }

    async fn find_by_token(&self, issuer: &str, token: &str) -> ProviderResult<Option<AccessToken>> {
        Ok(self.tokens.get(issuer, token))
    }

    async fn delete(&self, issuer: &str, token: &str) -> ProviderResult<bool> {
        Ok(self.tokens.remove(issuer, token))
    }
}

/// In-memory refresh tokens.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStorage {
    tokens: IssuerScoped<RefreshToken>,
}

impl MemoryRefreshTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn save(&self, token: &RefreshToken) -> ProviderResult<()> {
        self.tokens
            .insert_new("Refresh token", &token.issuer, &token.token, token.clone())
    }

    async fn find_by_token(
        &self,
        issuer: &str,
        token: &str,
    ) -> ProviderResult<Option<RefreshToken>> {
        Ok(self.tokens.get(issuer, token))
    }

    async fn delete(&self, issuer: &str, token: &str) -> ProviderResult<bool> {
        Ok(self.tokens.remove(issuer, token))
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// One in-memory store of every kind, wired into a [`ProviderConfig`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub issuers: Arc<MemoryIssuerConfigStorage>,
    pub clients: Arc<MemoryClientConfigStorage>,
    pub jwks: Arc<MemoryJwkConfigStorage>,
    pub user_claims: Arc<MemoryUserClaimSetStorage>,
    pub authorization_request_data: Arc<MemoryAuthorizationRequestDataStorage>,
    pub authorization_codes: Arc<MemoryAuthorizationCodeStorage>,
    pub access_tokens: Arc<MemoryAccessTokenStorage>,
    pub refresh_tokens: Arc<MemoryRefreshTokenStorage>,
}

impl MemoryStorage {
    /// Creates empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates stores seeded with the issuers and clients of `settings`.
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let storage = Self::new();
        settings.seed(&storage.issuers, &storage.clients);
        storage
    }

    /// Builds a [`ProviderConfig`] over these stores with default
    /// collaborators.
    #[must_use]
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(
            self.issuers.clone(),
            self.clients.clone(),
            self.jwks.clone(),
            self.user_claims.clone(),
            self.authorization_request_data.clone(),
            self.authorization_codes.clone(),
            self.access_tokens.clone(),
            self.refresh_tokens.clone(),
        )
    }
}
