//! End-user claims and ID token issuance.

mod claims;
mod id_token;

pub use claims::{AddressClaim, StandardClaim, UserClaimSet};
pub use id_token::{IdTokenClaims, IdTokenGenerator, left_half_hash};
