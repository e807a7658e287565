//! Storage traits for provider configuration and issued artifacts.
//!
//! Every record is scoped by issuer. Implementations must make `save`
//! an atomic insert-if-absent: saving a second record under an existing
//! (issuer, key) pair fails with [`ProviderError::Storage`](crate::ProviderError)
//! and leaves the first record in place.
//!
//! The [`memory`] module holds reference implementations backed by
//! `DashMap`.

pub mod authorization;
pub mod config;
pub mod memory;
pub mod token;

pub use authorization::{AuthorizationCodeStorage, AuthorizationRequestDataStorage};
pub use config::{ClientConfigStorage, IssuerConfigStorage, JwkConfigStorage, UserClaimSetStorage};
pub use token::{AccessTokenStorage, RefreshTokenStorage};
