//! TOML settings file.
//!
//! Lifetimes are written as human-readable durations and converted to whole
//! seconds when the records are built.
//!
//! # Example (TOML)
//!
//! ```toml
//! [endpoint]
//! token_endpoint = "/oauth/token"
//!
//! [[issuers]]
//! issuer = "http://localhost"
//! scopes = ["openid", "read", "write", "offline_access"]
//! response_types = ["code"]
//! grant_types = ["authorization_code", "refresh_token"]
//! code_challenge_methods = ["S256"]
//! require_pkce = true
//! access_token_lifetime = "1h"
//!
//! [[issuers.clients]]
//! id = "foo"
//! secret = "secret"
//! type = "confidential"
//! scopes = ["read", "write", "offline_access"]
//! grant_types = ["authorization_code", "refresh_token"]
//! redirect_uris = ["http://localhost/cb"]
//! access_token_lifetime = "5m"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ClientConfig, ClientType, Endpoint, IssuerConfig};
use crate::error::ProviderError;
use crate::metadata::{GrantType, PkceCodeChallengeMethod, ResponseType};
use crate::storage::memory::{MemoryClientConfigStorage, MemoryIssuerConfigStorage};
use crate::ProviderResult;

/// Root settings document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Endpoint path suffixes.
    pub endpoint: Endpoint,

    /// Tenants served by this engine.
    pub issuers: Vec<IssuerSettings>,
}

/// Settings of one tenant.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IssuerSettings {
    /// Issuer identifier.
    pub issuer: String,

    /// Allowed scopes.
    pub scopes: Vec<String>,

    /// Supported response types.
    pub response_types: Vec<ResponseType>,

    /// Supported grant types.
    pub grant_types: Vec<GrantType>,

    /// Supported PKCE methods.
    pub code_challenge_methods: Vec<PkceCodeChallengeMethod>,

    /// Whether PKCE is mandatory.
    pub require_pkce: bool,

    /// Stashed authorization request lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_request_lifetime: Duration,

    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Registered clients.
    pub clients: Vec<ClientSettings>,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        let defaults = IssuerConfig::new(String::new());
        Self {
            issuer: String::new(),
            scopes: defaults.scopes,
            response_types: defaults.supported_response_types,
            grant_types: defaults.supported_grant_types,
            code_challenge_methods: defaults.supported_code_challenge_methods,
            require_pkce: defaults.required_pkce,
            authorization_request_lifetime: seconds(defaults.authorization_request_data_duration),
            authorization_code_lifetime: seconds(defaults.authorization_code_duration),
            access_token_lifetime: seconds(defaults.access_token_duration),
            refresh_token_lifetime: seconds(defaults.refresh_token_duration),
            id_token_lifetime: seconds(defaults.id_token_duration),
            clients: Vec::new(),
        }
    }
}

/// Settings of one client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientSettings {
    /// Client identifier.
    pub id: String,

    /// Display name, defaults to the identifier.
    #[serde(default)]
    pub name: Option<String>,

    /// Shared secret.
    #[serde(default)]
    pub secret: String,

    /// Client type.
    #[serde(rename = "type")]
    pub client_type: ClientType,

    /// Allowed scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Allowed grant types.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Stashed authorization request lifetime override.
    #[serde(default, with = "humantime_serde")]
    pub authorization_request_lifetime: Option<Duration>,

    /// Authorization code lifetime override.
    #[serde(default, with = "humantime_serde")]
    pub authorization_code_lifetime: Option<Duration>,

    /// Access token lifetime override.
    #[serde(default, with = "humantime_serde")]
    pub access_token_lifetime: Option<Duration>,

    /// Refresh token lifetime override.
    #[serde(default, with = "humantime_serde")]
    pub refresh_token_lifetime: Option<Duration>,

    /// ID token lifetime override.
    #[serde(default, with = "humantime_serde")]
    pub id_token_lifetime: Option<Duration>,
}

impl ProviderSettings {
    /// Parses and validates a TOML settings document.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if the document does not parse
    /// or fails validation.
    pub fn from_toml_str(content: &str) -> ProviderResult<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| ProviderError::configuration(format!("TOML parse error: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a TOML settings file.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` if the file cannot be read,
    /// does not parse or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            issuers = settings.issuers.len(),
            "Loaded provider settings"
        );
        Ok(settings)
    }

    /// Checks cross-field rules serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` describing the first violation.
    pub fn validate(&self) -> ProviderResult<()> {
        for issuer in &self.issuers {
            if issuer.issuer.is_empty() {
                return Err(ProviderError::configuration("issuer must not be empty"));
            }
            for client in &issuer.clients {
                if client.id.is_empty() {
                    return Err(ProviderError::configuration(format!(
                        "client id must not be empty (issuer {})",
                        issuer.issuer
                    )));
                }
                if client.grant_types.contains(&GrantType::AuthorizationCode)
                    && client.redirect_uris.is_empty()
                {
                    return Err(ProviderError::configuration(format!(
                        "client {} uses authorization_code but has no redirect_uris",
                        client.id
                    )));
                }
                if client.client_type == ClientType::Confidential && client.secret.is_empty() {
                    return Err(ProviderError::configuration(format!(
                        "confidential client {} has no secret",
                        client.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Builds the issuer records.
    #[must_use]
    pub fn issuer_configs(&self) -> Vec<IssuerConfig> {
        self.issuers.iter().map(IssuerSettings::to_config).collect()
    }

    /// Builds the client records, each paired with its issuer.
    #[must_use]
    pub fn client_configs(&self) -> Vec<(String, ClientConfig)> {
        self.issuers
            .iter()
            .flat_map(|issuer| {
                issuer
                    .clients
                    .iter()
                    .map(|client| (issuer.issuer.clone(), client.to_config()))
            })
            .collect()
    }

    /// Loads every issuer and client into the in-memory stores.
    pub fn seed(&self, issuers: &MemoryIssuerConfigStorage, clients: &MemoryClientConfigStorage) {
        for issuer in self.issuer_configs() {
            issuers.insert(issuer);
        }
        for (issuer, client) in self.client_configs() {
            clients.insert(&issuer, client);
        }
    }
}

impl IssuerSettings {
    fn to_config(&self) -> IssuerConfig {
        IssuerConfig {
            issuer: self.issuer.clone(),
            scopes: self.scopes.clone(),
            supported_response_types: self.response_types.clone(),
            supported_grant_types: self.grant_types.clone(),
            supported_code_challenge_methods: self.code_challenge_methods.clone(),
            required_pkce: self.require_pkce,
            authorization_request_data_duration: whole_seconds(self.authorization_request_lifetime),
            authorization_code_duration: whole_seconds(self.authorization_code_lifetime),
            access_token_duration: whole_seconds(self.access_token_lifetime),
            refresh_token_duration: whole_seconds(self.refresh_token_lifetime),
            id_token_duration: whole_seconds(self.id_token_lifetime),
        }
    }
}

impl ClientSettings {
    fn to_config(&self) -> ClientConfig {
        ClientConfig {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            secret: self.secret.clone(),
            client_type: self.client_type,
            scopes: self.scopes.clone(),
            supported_grant_types: self.grant_types.clone(),
            redirect_uris: self.redirect_uris.clone(),
            authorization_request_data_duration: self.authorization_request_lifetime.map(whole_seconds),
            authorization_code_duration: self.authorization_code_lifetime.map(whole_seconds),
            access_token_duration: self.access_token_lifetime.map(whole_seconds),
            refresh_token_duration: self.refresh_token_lifetime.map(whole_seconds),
            id_token_duration: self.id_token_lifetime.map(whole_seconds),
        }
    }
}

fn whole_seconds(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

fn seconds(value: i64) -> Duration {
    Duration::from_secs(u64::try_from(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[endpoint]
token_endpoint = "/oauth/token"

[[issuers]]
issuer = "http://localhost"
scopes = ["openid", "read", "write", "offline_access"]
response_types = ["code"]
grant_types = ["authorization_code", "refresh_token"]
code_challenge_methods = ["S256", "plain"]
require_pkce = true
access_token_lifetime = "1h"
refresh_token_lifetime = "30days"

[[issuers.clients]]
id = "foo"
secret = "secret"
type = "confidential"
scopes = ["read", "write", "offline_access"]
grant_types = ["authorization_code", "refresh_token"]
redirect_uris = ["http://localhost/cb"]
access_token_lifetime = "5m"
"#;

    #[test]
    fn test_parse_sample_settings() {
        let settings = ProviderSettings::from_toml_str(SAMPLE).unwrap();

        assert_eq!(settings.endpoint.token_endpoint, "/oauth/token");
        assert_eq!(settings.endpoint.authorization_endpoint, "/auth");

        let issuers = settings.issuer_configs();
        assert_eq!(issuers.len(), 1);
        assert_eq!(issuers[0].access_token_duration, 3600);
        assert_eq!(issuers[0].refresh_token_duration, 30 * 24 * 3600);
        assert!(issuers[0].required_pkce);
        assert_eq!(
            issuers[0].supported_code_challenge_methods,
            vec![PkceCodeChallengeMethod::S256, PkceCodeChallengeMethod::Plain]
        );

        let clients = settings.client_configs();
        assert_eq!(clients.len(), 1);
        let (issuer, client) = &clients[0];
        assert_eq!(issuer, "http://localhost");
        assert_eq!(client.name, "foo");
        assert_eq!(client.access_token_duration, Some(300));
        assert_eq!(client.refresh_token_duration, None);
    }

    #[test]
    fn test_unspecified_lifetimes_use_defaults() {
        let settings = ProviderSettings::from_toml_str(
            r#"
[[issuers]]
issuer = "http://localhost"
"#,
        )
        .unwrap();
        let issuer = &settings.issuer_configs()[0];
        assert_eq!(
            issuer.authorization_code_duration,
            super::super::DEFAULT_AUTHORIZATION_CODE_DURATION
        );
    }

    #[test]
    fn test_code_client_without_redirect_uri_is_rejected() {
        let result = ProviderSettings::from_toml_str(
            r#"
[[issuers]]
issuer = "http://localhost"

[[issuers.clients]]
id = "foo"
secret = "secret"
type = "confidential"
grant_types = ["authorization_code"]
"#,
        );
        assert!(matches!(result, Err(ProviderError::Configuration { .. })));
    }

    #[test]
    fn test_malformed_toml_is_configuration_error() {
        let result = ProviderSettings::from_toml_str("[[issuers]\nissuer = ");
        assert!(matches!(result, Err(ProviderError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_seed_memory_storages() {
        use crate::storage::{ClientConfigStorage, IssuerConfigStorage};

        let settings = ProviderSettings::from_toml_str(SAMPLE).unwrap();
        let issuers = MemoryIssuerConfigStorage::new();
        let clients = MemoryClientConfigStorage::new();
        settings.seed(&issuers, &clients);

        assert!(
            issuers
                .find_by_issuer("http://localhost")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            clients
                .find_by_id("http://localhost", "foo")
                .await
                .unwrap()
                .is_some()
        );
    }
}
