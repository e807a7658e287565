//! Engine-level error types.
//!
//! Protocol failures (bad parameters, wrong credentials, expired grants) are
//! never represented here. Each endpoint owns its own RFC-aligned error
//! family under [`crate::request`]. This module only covers conditions that
//! are fatal to a request regardless of the protocol: the tenant could not be
//! resolved, a storage collaborator failed, or the issuer is misconfigured.

/// Fatal, non-protocol failures raised by the engine or its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No issuer configuration is registered for the requested tenant.
    #[error("Not found issuer. [{issuer}]")]
    IssuerNotFound {
        /// The issuer identifier that failed to resolve.
        issuer: String,
    },

    /// A storage collaborator failed to read or write.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An ID token could not be signed.
    #[error("Signing error: {message}")]
    Signing {
        /// Description of the signing error.
        message: String,
    },

    /// The engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ProviderError {
    /// Creates a new `IssuerNotFound` error.
    #[must_use]
    pub fn issuer_not_found(issuer: impl Into<String>) -> Self {
        Self::IssuerNotFound {
            issuer: issuer.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the tenant could not be resolved.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IssuerNotFound { .. })
    }

    /// Returns the category of this error for logging and metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::IssuerNotFound { .. } => "not_found",
            Self::Storage { .. } => "storage",
            Self::Signing { .. } => "signing",
            Self::Configuration { .. } => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_not_found_display() {
        let err = ProviderError::issuer_not_found("http://unknown");
        assert_eq!(err.to_string(), "Not found issuer. [http://unknown]");
        assert!(err.is_not_found());
        assert_eq!(err.category(), "not_found");
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        assert!(!ProviderError::storage("down").is_not_found());
        assert!(!ProviderError::signing("no key").is_not_found());
        assert_eq!(ProviderError::configuration("x").category(), "configuration");
    }
}
