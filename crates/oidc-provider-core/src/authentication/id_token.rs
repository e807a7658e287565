//! ID token issuance (OIDC Core §2, §3.1.3.6, §3.3.2.11).

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::ProviderResult;
use crate::clock::Clock;
use crate::config::{ClientConfig, IssuerConfig};
use crate::error::ProviderError;
use crate::jwk::SigningAlgorithm;
use crate::request::authentication::AuthenticationRequest;
use crate::storage::{JwkConfigStorage, UserClaimSetStorage};

/// Claims registered by OIDC Core for the ID token itself. User claims with
/// these names are dropped.
const REGISTERED_CLAIMS: &[&str] = &[
    "iss", "sub", "aud", "exp", "iat", "auth_time", "nonce", "acr", "amr", "azp", "at_hash",
    "c_hash",
];

/// Claims of an issued ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer.
    pub iss: String,
    /// Authenticated end user.
    pub sub: String,
    /// Client the token is intended for.
    pub aud: String,
    /// Issue time (epoch seconds).
    pub iat: i64,
    /// Expiry (epoch seconds).
    pub exp: i64,
    /// Nonce from the authentication request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Access token hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,
    /// Authorization code hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_hash: Option<String>,
    /// Standard and custom user claims.
    #[serde(flatten)]
    pub user_claims: Map<String, Value>,
}

/// Computes `at_hash` / `c_hash`: the base64url encoded left half of the
/// digest of `value`, using the hash of the signing algorithm.
#[must_use]
pub fn left_half_hash(algorithm: SigningAlgorithm, value: &str) -> String {
    let digest = match algorithm.hash_bits() {
        256 => Sha256::digest(value.as_bytes()).to_vec(),
        384 => Sha384::digest(value.as_bytes()).to_vec(),
        _ => Sha512::digest(value.as_bytes()).to_vec(),
    };
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

/// Issues signed ID tokens with the issuer's primary key.
#[derive(Clone)]
pub struct IdTokenGenerator {
    jwks: Arc<dyn JwkConfigStorage>,
    user_claims: Arc<dyn UserClaimSetStorage>,
    clock: Arc<dyn Clock>,
}

impl IdTokenGenerator {
    /// Creates a generator.
    pub fn new(
        jwks: Arc<dyn JwkConfigStorage>,
        user_claims: Arc<dyn UserClaimSetStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jwks,
            user_claims,
            clock,
        }
    }

    /// Issues an ID token for `subject` answering `authentication_request`.
    ///
    /// `access_token` and `code` are hashed into `at_hash` and `c_hash` when
    /// issued alongside.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Signing`] when the issuer has no primary key
    /// or signing fails.
    pub async fn generate(
        &self,
        issuer: &IssuerConfig,
        client: &ClientConfig,
        authentication_request: &AuthenticationRequest,
        access_token: Option<&str>,
        code: Option<&str>,
        subject: &str,
    ) -> ProviderResult<String> {
        let jwk = self
            .jwks
            .find_primary(&issuer.issuer)
            .await?
            .ok_or_else(|| {
                ProviderError::signing(format!("No primary signing key. [{}]", issuer.issuer))
            })?;
        let algorithm = jwk.algorithm();

        let mut user_claims = self
            .user_claims
            .find_by_subject(&issuer.issuer, subject)
            .await?
            .map(|claims| claims.to_claims())
            .unwrap_or_default();
        user_claims.retain(|name, _| !REGISTERED_CLAIMS.contains(&name.as_str()));

        let iat = self.clock.epoch_second();
        let claims = IdTokenClaims {
            iss: issuer.issuer.clone(),
            sub: subject.to_string(),
            aud: client.id.clone(),
            iat,
            exp: iat + client.id_token_duration_for(issuer),
            nonce: authentication_request.nonce.clone(),
            at_hash: access_token.map(|token| left_half_hash(algorithm, token)),
            c_hash: code.map(|code| left_half_hash(algorithm, code)),
            user_claims,
        };

        let token = jwk.key.sign(&claims)?;

        tracing::debug!(issuer = %issuer.issuer, client_id = %client.id, kid = %jwk.kid(), "Issued ID token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{StandardClaim, UserClaimSet};
    use crate::clock::SystemClock;
    use crate::config::ClientType;
    use crate::jwk::{JwkConfig, SigningKeyPair};
    use crate::metadata::ResponseType;
    use crate::storage::memory::{MemoryJwkConfigStorage, MemoryUserClaimSetStorage};

    const ISSUER: &str = "http://localhost";

    fn authentication_request(nonce: Option<&str>) -> AuthenticationRequest {
        AuthenticationRequest {
            scope: vec!["openid".to_string()],
            response_type: vec![ResponseType::Code],
            client_id: "foo".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            state: None,
            response_mode: None,
            nonce: nonce.map(str::to_string),
            display: None,
            prompt: None,
            max_age: None,
            ui_locales: None,
            id_token_hint: None,
            login_hint: None,
            acr_values: None,
        }
    }

    #[test]
    fn test_left_half_hash_lengths() {
        // 16, 24 and 32 bytes encode to 22, 32 and 43 characters.
        assert_eq!(left_half_hash(SigningAlgorithm::RS256, "token").len(), 22);
        assert_eq!(left_half_hash(SigningAlgorithm::ES384, "token").len(), 32);
        assert_eq!(left_half_hash(SigningAlgorithm::RS512, "token").len(), 43);
    }

    #[test]
    fn test_left_half_hash_value() {
        let digest = Sha256::digest(b"abc");
        assert_eq!(
            left_half_hash(SigningAlgorithm::RS256, "abc"),
            URL_SAFE_NO_PAD.encode(&digest[..16])
        );
    }

    #[tokio::test]
    async fn test_generate_signed_id_token() {
        let key = SigningKeyPair::generate_ec().unwrap();
        let jwks = MemoryJwkConfigStorage::new();
        jwks.insert(ISSUER, JwkConfig::primary(key));
        let jwks = Arc::new(jwks);

        let user_claims = MemoryUserClaimSetStorage::new();
        user_claims.insert(
            ISSUER,
            "alice",
            UserClaimSet::new(StandardClaim {
                email: Some("alice@example.com".to_string()),
                ..StandardClaim::default()
            })
            .with_custom_claim("sub", "mallory")
            .with_custom_claim("tenant", "acme"),
        );

        let generator = IdTokenGenerator::new(jwks.clone(), Arc::new(user_claims), Arc::new(SystemClock));
        let issuer = IssuerConfig::new(ISSUER);
        let client = ClientConfig::new("foo", "secret", ClientType::Confidential);

        let token = generator
            .generate(
                &issuer,
                &client,
                &authentication_request(Some("n1")),
                Some("at1"),
                Some("c1"),
                "alice",
            )
            .await
            .unwrap();

        let primary = jwks.find_primary(ISSUER).await.unwrap().unwrap();
        let decoded = primary
            .key
            .verify::<IdTokenClaims>(&token, ISSUER, "foo")
            .unwrap();

        assert_eq!(decoded.header.kid.as_deref(), Some(primary.kid()));
        let claims = decoded.claims;
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.nonce.as_deref(), Some("n1"));
        assert_eq!(
            claims.at_hash,
            Some(left_half_hash(SigningAlgorithm::ES384, "at1"))
        );
        assert_eq!(
            claims.c_hash,
            Some(left_half_hash(SigningAlgorithm::ES384, "c1"))
        );
        assert_eq!(claims.user_claims["email"], "alice@example.com");
        assert_eq!(claims.user_claims["tenant"], "acme");
        assert_eq!(claims.exp - claims.iat, issuer.id_token_duration);
    }

    #[tokio::test]
    async fn test_missing_primary_key() {
        let generator = IdTokenGenerator::new(
            Arc::new(MemoryJwkConfigStorage::new()),
            Arc::new(MemoryUserClaimSetStorage::new()),
            Arc::new(SystemClock),
        );

        let result = generator
            .generate(
                &IssuerConfig::new(ISSUER),
                &ClientConfig::new("foo", "secret", ClientType::Confidential),
                &authentication_request(None),
                None,
                None,
                "alice",
            )
            .await;

        assert!(matches!(result, Err(ProviderError::Signing { .. })));
    }
}
