//! Issued access and refresh tokens.

use async_trait::async_trait;

use crate::ProviderResult;
use crate::authorization::{AccessToken, RefreshToken};

/// Storage operations for access tokens.
#[async_trait]
pub trait AccessTokenStorage: Send + Sync {
    /// Save `token` under its issuer and value.
    ///
    /// # Errors
    ///
    /// Returns an error if the token value is taken or the storage operation
    /// fails.
    async fn save(&self, token: &AccessToken) -> ProviderResult<()>;

    /// Find a token by value. Expired tokens are returned as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(&self, issuer: &str, token: &str)
    -> ProviderResult<Option<AccessToken>>;

    /// Delete a token. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, issuer: &str, token: &str) -> ProviderResult<bool>;
}

/// Storage operations for refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Save `token` under its issuer and value.
    ///
    /// # Errors
    ///
    /// Returns an error if the token value is taken or the storage operation
    /// fails.
    async fn save(&self, token: &RefreshToken) -> ProviderResult<()>;

    /// Find a token by value. Expired tokens are returned as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token(
        &self,
        issuer: &str,
        token: &str,
    ) -> ProviderResult<Option<RefreshToken>>;

    /// Delete a token. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, issuer: &str, token: &str) -> ProviderResult<bool>;
}
