//! Configuration lookups.

use async_trait::async_trait;

use crate::ProviderResult;
use crate::authentication::UserClaimSet;
use crate::config::{ClientConfig, IssuerConfig};
use crate::jwk::JwkConfig;

// =============================================================================
// Issuer and client
// =============================================================================

/// Issuer (tenant) lookup.
#[async_trait]
pub trait IssuerConfigStorage: Send + Sync {
    /// Find the configuration of `issuer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_issuer(&self, issuer: &str) -> ProviderResult<Option<IssuerConfig>>;
}

/// Client registration lookup.
#[async_trait]
pub trait ClientConfigStorage: Send + Sync {
    /// Find client `client_id` registered with `issuer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, issuer: &str, client_id: &str)
    -> ProviderResult<Option<ClientConfig>>;
}

// =============================================================================
// Keys and claims
// =============================================================================

/// Signing key lookup.
#[async_trait]
pub trait JwkConfigStorage: Send + Sync {
    /// All keys registered for `issuer`, primary or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_issuer(&self, issuer: &str) -> ProviderResult<Vec<JwkConfig>>;

    /// The key ID tokens are signed with.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_primary(&self, issuer: &str) -> ProviderResult<Option<JwkConfig>> {
        Ok(self
            .find_by_issuer(issuer)
            .await?
            .into_iter()
            .find(|jwk| jwk.is_primary))
    }

    /// The key with ID `kid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_kid(&self, issuer: &str, kid: &str) -> ProviderResult<Option<JwkConfig>> {
        Ok(self
            .find_by_issuer(issuer)
            .await?
            .into_iter()
            .find(|jwk| jwk.kid() == kid))
    }
}

/// End-user claim lookup.
#[async_trait]
pub trait UserClaimSetStorage: Send + Sync {
    /// Claims of `subject` under `issuer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_subject(
        &self,
        issuer: &str,
        subject: &str,
    ) -> ProviderResult<Option<UserClaimSet>>;
}
