//! `client_secret_post` (RFC 6749 §2.3.1).

use std::sync::Arc;

use async_trait::async_trait;

use super::{ClientAuthenticationError, ClientAuthenticator};
use crate::config::{ClientConfig, IssuerConfig};
use crate::http::{HttpMethod, HttpRequest, required, single};
use crate::request::{duplicated_message, required_message};
use crate::storage::ClientConfigStorage;

/// Authenticates clients from `client_id` / `client_secret` body parameters.
#[derive(Clone)]
pub struct ClientSecretPostAuthenticator {
    clients: Arc<dyn ClientConfigStorage>,
}

impl ClientSecretPostAuthenticator {
    /// Creates an authenticator resolving clients from `clients`.
    pub fn new(clients: Arc<dyn ClientConfigStorage>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ClientAuthenticator for ClientSecretPostAuthenticator {
    fn matches(&self, _issuer: &IssuerConfig, request: &HttpRequest) -> bool {
        request.method == HttpMethod::Post
            && request.form_parameters.contains_key("client_id")
            && request.form_parameters.contains_key("client_secret")
    }

    async fn authenticate(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<ClientConfig, ClientAuthenticationError> {
        if request.method != HttpMethod::Post {
            return Err(ClientAuthenticationError::malformed());
        }

        let client_id = form_parameter(request, "client_id")?;
        let secret = form_parameter(request, "client_secret")?;

        let client = self
            .clients
            .find_by_id(&issuer.issuer, &client_id)
            .await?
            .ok_or(ClientAuthenticationError::InvalidCredentials)?;

        if !client.verify_secret(&secret) {
            return Err(ClientAuthenticationError::InvalidCredentials);
        }
        Ok(client)
    }
}

fn form_parameter(request: &HttpRequest, name: &str) -> Result<String, ClientAuthenticationError> {
    let values = required(request.form(name), || {
        ClientAuthenticationError::invalid_request(required_message(name))
    })?;
    single(values, || {
        ClientAuthenticationError::invalid_request(duplicated_message(name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;
    use crate::storage::memory::MemoryClientConfigStorage;

    fn authenticator() -> ClientSecretPostAuthenticator {
        let clients = MemoryClientConfigStorage::new();
        clients.insert(
            "http://localhost",
            ClientConfig::new("foo", "secret", ClientType::Confidential),
        );
        ClientSecretPostAuthenticator::new(Arc::new(clients))
    }

    #[tokio::test]
    async fn test_authenticate_form_credentials() {
        let issuer = IssuerConfig::new("http://localhost");
        let request = HttpRequest::post()
            .with_form("client_id", "foo")
            .with_form("client_secret", "secret");

        assert!(authenticator().matches(&issuer, &request));
        assert_eq!(
            authenticator()
                .authenticate(&issuer, &request)
                .await
                .unwrap()
                .id,
            "foo"
        );
    }

    #[test]
    fn test_query_credentials_do_not_match() {
        let request = HttpRequest::get()
            .with_query("client_id", "foo")
            .with_query("client_secret", "secret");
        assert!(!authenticator().matches(&IssuerConfig::new("http://localhost"), &request));
    }

    #[tokio::test]
    async fn test_duplicated_secret() {
        let request = HttpRequest::post()
            .with_form("client_id", "foo")
            .with_form("client_secret", "secret")
            .with_form("client_secret", "secret");

        let result = authenticator()
            .authenticate(&IssuerConfig::new("http://localhost"), &request)
            .await;
        assert_eq!(
            result,
            Err(ClientAuthenticationError::invalid_request(
                "'client_secret' is duplicated."
            ))
        );
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let request = HttpRequest::post()
            .with_form("client_id", "foo")
            .with_form("client_secret", "nope");

        let result = authenticator()
            .authenticate(&IssuerConfig::new("http://localhost"), &request)
            .await;
        assert_eq!(result, Err(ClientAuthenticationError::InvalidCredentials));
    }
}
