//! Protocol values and discovery documents.

mod oauth2;
mod oidc;
mod values;

pub use oauth2::OAuth2Metadata;
pub use oidc::OidcMetadata;
pub use values::*;

/// Joins an issuer URL and an endpoint path suffix.
pub(crate) fn endpoint_url(issuer: &str, path: &str) -> String {
    format!("{}{}", issuer.trim_end_matches('/'), path)
}
