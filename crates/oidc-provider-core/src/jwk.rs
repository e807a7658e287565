//! Signing keys and JSON Web Key Sets.
//!
//! An issuer registers its keys as [`JwkConfig`] entries. ID tokens are
//! signed with the entry flagged primary; every entry is published through
//! the JWKS endpoint, so a retired key can stay verifiable while a new one
//! signs.
//!
//! Supported algorithms: RS256, RS384, RS512 (2048-bit RSA) and ES384
//! (P-384).
//!
//! ```ignore
//! use oidc_provider_core::jwk::{JwkConfig, SigningAlgorithm, SigningKeyPair};
//!
//! let config = JwkConfig::primary(SigningKeyPair::generate_rsa(SigningAlgorithm::RS256)?);
//! ```

use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use elliptic_curve::sec1::ToEncodedPoint;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use p384::SecretKey as EcSecretKey;
use p384::pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey as _;
use rsa::traits::PublicKeyParts;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

const RSA_KEY_BITS: usize = 2048;

/// Failures while creating, loading or using a signing key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Key generation failed: {0}")]
    Generation(String),

    #[error("Invalid key: {0}")]
    Invalid(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Verification failed: {0}")]
    Verification(String),
}

impl From<KeyError> for ProviderError {
    fn from(e: KeyError) -> Self {
        ProviderError::signing(e.to_string())
    }
}

// ============================================================================
// Algorithms
// ============================================================================

/// JWS algorithms an issuer can sign ID tokens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    RS256,
    RS384,
    RS512,
    ES384,
}

impl SigningAlgorithm {
    /// Registered `alg` value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES384 => "ES384",
        }
    }

    /// JWK `kty` of keys for this algorithm.
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        match self {
            Self::ES384 => "EC",
            Self::RS256 | Self::RS384 | Self::RS512 => "RSA",
        }
    }

    /// Size of the SHA-2 digest the algorithm signs over. `at_hash` and
    /// `c_hash` use the same digest.
    #[must_use]
    pub fn hash_bits(&self) -> u16 {
        match self {
            Self::RS256 => 256,
            Self::RS384 | Self::ES384 => 384,
            Self::RS512 => 512,
        }
    }

    fn jws(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::ES384 => Algorithm::ES384,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// JWK Set
// ============================================================================

/// JSON Web Key Set (RFC 7517 §5).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Public half of a signing key, as published in the JWK Set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub alg: String,

    /// RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// EC curve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC point coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl Jwk {
    fn signing(kid: &str, algorithm: SigningAlgorithm) -> Self {
        Self {
            kty: algorithm.key_type().to_string(),
            kid: kid.to_string(),
            use_: "sig".to_string(),
            alg: algorithm.as_str().to_string(),
            n: None,
            e: None,
            crv: None,
            x: None,
            y: None,
        }
    }
}

/// Base64url-encoded public parameters.
#[derive(Debug, Clone)]
enum PublicParameters {
    Rsa { n: String, e: String },
    Ec { x: String, y: String },
}

impl PublicParameters {
    fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        let key = match self {
            Self::Rsa { n, e } => DecodingKey::from_rsa_components(n, e),
            Self::Ec { x, y } => DecodingKey::from_ec_components(x, y),
        };
        key.map_err(|e| KeyError::Invalid(e.to_string()))
    }
}

// ============================================================================
// Key pair
// ============================================================================

/// A private signing key with its public parameters.
pub struct SigningKeyPair {
    pub kid: String,
    pub algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public: PublicParameters,
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generates a 2048-bit RSA key with a random `kid`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Invalid`] for a non-RSA `algorithm` and
    /// [`KeyError::Generation`] if the key cannot be generated.
    pub fn generate_rsa(algorithm: SigningAlgorithm) -> Result<Self, KeyError> {
        if algorithm.key_type() != "RSA" {
            return Err(KeyError::Invalid(format!("{algorithm} does not use RSA keys")));
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| KeyError::Generation(e.to_string()))?;
        Self::from_rsa(random_kid(), algorithm, &private_key)
    }

    /// Generates a P-384 key with a random `kid`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Generation`] if the key cannot be encoded.
    pub fn generate_ec() -> Result<Self, KeyError> {
        let secret_key = EcSecretKey::random(&mut OsRng);
        Self::from_ec(random_kid(), &secret_key)
            .map_err(|e| KeyError::Generation(e.to_string()))
    }

    /// Loads a private key from PEM. The public half is derived from it.
    ///
    /// RSA keys may be PKCS#1 or PKCS#8, EC keys PKCS#8 or SEC1.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Invalid`] if the PEM does not hold a key for
    /// `algorithm`.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
    ) -> Result<Self, KeyError> {
        let kid = kid.into();

        if algorithm == SigningAlgorithm::ES384 {
            let secret_key = EcSecretKey::from_pkcs8_pem(private_pem)
                .or_else(|_| EcSecretKey::from_sec1_pem(private_pem))
                .map_err(|e| KeyError::Invalid(e.to_string()))?;
            return Self::from_ec(kid, &secret_key);
        }

        let private_key = RsaPrivateKey::from_pkcs1_pem(private_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(private_pem))
            .map_err(|e| KeyError::Invalid(e.to_string()))?;
        Self::from_rsa(kid, algorithm, &private_key)
    }

    fn from_rsa(
        kid: String,
        algorithm: SigningAlgorithm,
        private_key: &RsaPrivateKey,
    ) -> Result<Self, KeyError> {
        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| KeyError::Invalid(e.to_string()))?;
        let public = PublicParameters::Rsa {
            n: URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be()),
        };

        Ok(Self {
            kid,
            algorithm,
            encoding_key: EncodingKey::from_rsa_der(der.as_bytes()),
            decoding_key: public.decoding_key()?,
            public,
        })
    }

    fn from_ec(kid: String, secret_key: &EcSecretKey) -> Result<Self, KeyError> {
        let der = secret_key
            .to_pkcs8_der()
            .map_err(|e| KeyError::Invalid(e.to_string()))?;
        let point = secret_key.public_key().to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(KeyError::Invalid("EC point is not uncompressed".to_string()));
        };
        let public = PublicParameters::Ec {
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        };

        Ok(Self {
            kid,
            algorithm: SigningAlgorithm::ES384,
            encoding_key: EncodingKey::from_ec_der(der.as_bytes()),
            decoding_key: public.decoding_key()?,
            public,
        })
    }

    /// Signs `claims` as a compact JWS carrying this key's `kid`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Signing`] if the claims cannot be encoded.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, KeyError> {
        let mut header = Header::new(self.algorithm.jws());
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).map_err(|e| KeyError::Signing(e.to_string()))
    }

    /// Checks the signature, `iss` and `aud` of a JWS issued with this key.
    ///
    /// Expiry is not checked here: the engine runs on an injected
    /// [`Clock`](crate::clock::Clock), so callers compare `exp` themselves.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Verification`] when any check fails.
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        issuer: &str,
        audience: &str,
    ) -> Result<TokenData<T>, KeyError> {
        let mut validation = Validation::new(self.algorithm.jws());
        validation.validate_exp = false;
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        decode(token, &self.decoding_key, &validation)
            .map_err(|e| KeyError::Verification(e.to_string()))
    }

    /// Public half as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        let jwk = Jwk::signing(&self.kid, self.algorithm);
        match &self.public {
            PublicParameters::Rsa { n, e } => Jwk {
                n: Some(n.clone()),
                e: Some(e.clone()),
                ..jwk
            },
            PublicParameters::Ec { x, y } => Jwk {
                crv: Some("P-384".to_string()),
                x: Some(x.clone()),
                y: Some(y.clone()),
                ..jwk
            },
        }
    }
}

fn random_kid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Issuer registration
// ============================================================================

/// A key registered for an issuer.
#[derive(Debug, Clone)]
pub struct JwkConfig {
    /// Whether ID tokens are signed with this key.
    pub is_primary: bool,
    pub key: Arc<SigningKeyPair>,
}

impl JwkConfig {
    /// Registers `key` as the signing key.
    #[must_use]
    pub fn primary(key: SigningKeyPair) -> Self {
        Self {
            is_primary: true,
            key: Arc::new(key),
        }
    }

    /// Registers `key` for publication only.
    #[must_use]
    pub fn secondary(key: SigningKeyPair) -> Self {
        Self {
            is_primary: false,
            key: Arc::new(key),
        }
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.key.kid
    }

    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.key.algorithm
    }

    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        self.key.to_jwk()
    }
}
