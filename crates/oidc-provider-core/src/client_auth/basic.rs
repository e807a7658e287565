//! `client_secret_basic` (RFC 6749 §2.3.1).

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};

use super::{ClientAuthenticationError, ClientAuthenticator};
use crate::config::{ClientConfig, IssuerConfig};
use crate::http::{HttpRequest, required, single};
use crate::storage::ClientConfigStorage;

const AUTHORIZATION: &str = "Authorization";

/// Authenticates clients from an `Authorization: Basic` header.
#[derive(Clone)]
pub struct ClientSecretBasicAuthenticator {
    clients: Arc<dyn ClientConfigStorage>,
}

impl ClientSecretBasicAuthenticator {
    /// Creates an authenticator resolving clients from `clients`.
    pub fn new(clients: Arc<dyn ClientConfigStorage>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl ClientAuthenticator for ClientSecretBasicAuthenticator {
    fn matches(&self, _issuer: &IssuerConfig, request: &HttpRequest) -> bool {
        request
            .header(AUTHORIZATION)
            .is_some_and(|values| values.iter().any(|value| value.starts_with("Basic")))
    }

    async fn authenticate(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<ClientConfig, ClientAuthenticationError> {
        let (client_id, secret) = parse_credentials(request)?;

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

/// Extracts `(client_id, secret)` from the single `Authorization` header.
fn parse_credentials(request: &HttpRequest) -> Result<(String, String), ClientAuthenticationError> {
    let values = required(
        request.header(AUTHORIZATION),
        ClientAuthenticationError::malformed,
    )?;
    let header = single(values, ClientAuthenticationError::malformed)?;

    let (scheme, encoded) = match header.split(' ').collect::<Vec<_>>()[..] {
        [scheme, encoded] => (scheme, encoded),
        _ => return Err(ClientAuthenticationError::malformed()),
    };
    if scheme != "Basic" {
        return Err(ClientAuthenticationError::malformed());
    }

    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(ClientAuthenticationError::malformed)?;

    match decoded.split(':').collect::<Vec<_>>()[..] {
        [client_id, secret] => Ok((client_id.to_string(), secret.to_string())),
        _ => Err(ClientAuthenticationError::malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;
    use crate::storage::memory::MemoryClientConfigStorage;

    fn authenticator() -> ClientSecretBasicAuthenticator {
        let clients = MemoryClientConfigStorage::new();
        clients.insert(
            "http://localhost",
            ClientConfig::new("foo", "secret", ClientType::Confidential),
        );
        ClientSecretBasicAuthenticator::new(Arc::new(clients))
    }

    fn basic(credentials: &str) -> HttpRequest {
        HttpRequest::post().with_header(
            "Authorization",
            format!("Basic {}", STANDARD.encode(credentials)),
        )
    }

    #[tokio::test]
    async fn test_authenticate_valid_credentials() {
        let issuer = IssuerConfig::new("http://localhost");
        let request = basic("foo:secret");

        assert!(authenticator().matches(&issuer, &request));
        let client = authenticator()
            .authenticate(&issuer, &request)
            .await
            .unwrap();
        assert_eq!(client.id, "foo");
    }

    #[tokio::test]
    async fn test_wrong_secret_and_unknown_client() {
        let issuer = IssuerConfig::new("http://localhost");

        let result = authenticator()
            .authenticate(&issuer, &basic("foo:wrong"))
            .await;
        assert_eq!(result, Err(ClientAuthenticationError::InvalidCredentials));

        let result = authenticator()
            .authenticate(&issuer, &basic("bar:secret"))
            .await;
        assert_eq!(result, Err(ClientAuthenticationError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_public_client_has_no_secret() {
        let issuer = IssuerConfig::new("http://localhost");
        let clients = MemoryClientConfigStorage::new();
        clients.insert(
            "http://localhost",
            ClientConfig::new("pub", "", ClientType::Public),
        );
        let authenticator = ClientSecretBasicAuthenticator::new(Arc::new(clients));

        let result = authenticator.authenticate(&issuer, &basic("pub:")).await;
        assert_eq!(result, Err(ClientAuthenticationError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_malformed_headers() {
        let issuer = IssuerConfig::new("http://localhost");

        for request in [
            basic("no-colon"),
            basic("a:b:c"),
            HttpRequest::post().with_header("Authorization", "Basic !!!"),
            HttpRequest::post().with_header("Authorization", "Basicfoo"),
            HttpRequest::post()
                .with_header("Authorization", "Basic Zm9vOnNlY3JldA==")
                .with_header("Authorization", "Basic Zm9vOnNlY3JldA=="),
        ] {
            let result = authenticator().authenticate(&issuer, &request).await;
            assert!(
                matches!(result, Err(ClientAuthenticationError::InvalidRequest { .. })),
                "{request:?}"
            );
        }
    }

    #[test]
    fn test_bearer_header_does_not_match() {
        let request = HttpRequest::post().with_header("Authorization", "Bearer abc");
        assert!(!authenticator().matches(&IssuerConfig::new("http://localhost"), &request));
    }
}
