//! Client authentication at the token, introspection and revocation
//! endpoints.
//!
//! A [`ClientAuthenticationManager`] holds an ordered list of
//! [`ClientAuthenticator`] strategies. Exactly one strategy must recognize
//! the credentials carried by a request:
//!
//! - none matches: [`ClientAuthenticationError::UnmatchedAuthenticationMethod`]
//! - more than one matches: [`ClientAuthenticationError::InvalidRequest`]
//! - one matches: its result is returned as is
//!
//! Callers decide whether an unmatched request is an error. Grants that
//! allow public clients treat it as "no client authentication".

mod basic;
mod post;

pub use basic::ClientSecretBasicAuthenticator;
pub use post::ClientSecretPostAuthenticator;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ClientConfig, IssuerConfig};
use crate::error::ProviderError;
use crate::http::HttpRequest;

// =============================================================================
// Errors
// =============================================================================

/// Client authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientAuthenticationError {
    /// No strategy recognized the request's credentials.
    #[error("No client authentication method matched")]
    UnmatchedAuthenticationMethod,

    /// The credentials are malformed.
    #[error("Invalid client authentication request: {}", .description.as_deref().unwrap_or_default())]
    InvalidRequest {
        /// What is wrong with the credentials.
        description: Option<String>,
    },

    /// Unknown client or wrong secret.
    #[error("Invalid client credentials")]
    InvalidCredentials,

    /// Storage failure while resolving the client.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ClientAuthenticationError {
    /// Creates an `InvalidRequest` error with a description.
    #[must_use]
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::InvalidRequest {
            description: Some(description.into()),
        }
    }

    /// Creates an `InvalidRequest` error without a description.
    #[must_use]
    pub fn malformed() -> Self {
        Self::InvalidRequest { description: None }
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// One way of authenticating a client.
#[async_trait]
pub trait ClientAuthenticator: Send + Sync {
    /// Returns `true` if the request carries credentials for this method.
    fn matches(&self, issuer: &IssuerConfig, request: &HttpRequest) -> bool;

    /// Authenticates the client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for malformed credentials and
    /// `InvalidCredentials` for an unknown client or a wrong secret.
    async fn authenticate(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<ClientConfig, ClientAuthenticationError>;
}

/// Dispatches to the single matching [`ClientAuthenticator`].
#[derive(Clone, Default)]
pub struct ClientAuthenticationManager {
    authenticators: Vec<Arc<dyn ClientAuthenticator>>,
}

impl ClientAuthenticationManager {
    /// Creates a manager over `authenticators`, tried in order.
    #[must_use]
    pub fn new(authenticators: Vec<Arc<dyn ClientAuthenticator>>) -> Self {
        Self { authenticators }
    }

    /// Authenticates the client of `request`.
    ///
    /// # Errors
    ///
    /// See the module documentation.
    pub async fn authenticate(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<ClientConfig, ClientAuthenticationError> {
        let mut matched = self
            .authenticators
            .iter()
            .filter(|authenticator| authenticator.matches(issuer, request));

        let Some(authenticator) = matched.next() else {
            return Err(ClientAuthenticationError::UnmatchedAuthenticationMethod);
        };
        if matched.next().is_some() {
            tracing::warn!(issuer = %issuer.issuer, "Duplicate client authentication credentials");
            return Err(ClientAuthenticationError::invalid_request(
                "Duplicate client authentication credentials.",
            ));
        }

        let result = authenticator.authenticate(issuer, request).await;
        if let Err(ClientAuthenticationError::InvalidCredentials) = &result {
            tracing::warn!(issuer = %issuer.issuer, "Client authentication failed");
        }
        result
    }
}
