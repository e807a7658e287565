//! Authorization endpoint artifacts.

use async_trait::async_trait;

use crate::ProviderResult;
use crate::authorization::AuthorizationCode;
use crate::request::authorization::AuthorizationRequestData;

/// Authorization requests stashed between the pre- and post-process steps.
#[async_trait]
pub trait AuthorizationRequestDataStorage: Send + Sync {
    /// Save `data` under its issuer and key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is taken or the storage operation fails.
    async fn save(&self, data: &AuthorizationRequestData) -> ProviderResult<()>;

    /// Find the request stashed under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_key(
        &self,
        issuer: &str,
        key: &str,
    ) -> ProviderResult<Option<AuthorizationRequestData>>;

    /// Delete the request stashed under `key`. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, issuer: &str, key: &str) -> ProviderResult<bool>;
}

/// Issued authorization codes.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Save `code` under its issuer and value.
    ///
    /// # Errors
    ///
    /// Returns an error if the code value is taken or the storage operation
    /// fails.
    async fn save(&self, code: &AuthorizationCode) -> ProviderResult<()>;

    /// Find a code by value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_code(&self, issuer: &str, code: &str)
    -> ProviderResult<Option<AuthorizationCode>>;

    /// Delete a code. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, issuer: &str, code: &str) -> ProviderResult<bool>;
}
