//! Typed protocol requests and their converters.
//!
//! Each endpoint has a converter that turns an [`HttpRequest`](crate::http::HttpRequest)
//! into a validated request value or an error from that endpoint's error
//! family:
//!
//! - [`authorization`] / [`authentication`]: redirect-channel errors
//! - [`token`], [`introspection`], [`revocation`]: body-channel errors
//!
//! Body-channel errors render as an [`ErrorBody`].

pub mod authentication;
pub mod authorization;
pub mod introspection;
pub mod revocation;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::http::{Parameters, required, single, single_or_none};
use crate::metadata::TokenTypeHint;

/// JSON error document returned by the token, introspection and revocation
/// endpoints (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code.
    pub error: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI of a page describing the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl ErrorBody {
    /// Creates an error body.
    #[must_use]
    pub fn new(
        error: impl Into<String>,
        error_description: Option<String>,
        error_uri: Option<String>,
    ) -> Self {
        Self {
            error: error.into(),
            error_description,
            error_uri,
        }
    }
}

// =============================================================================
// Parameter messages
// =============================================================================

pub(crate) fn required_message(name: &str) -> String {
    format!("'{name}' is required.")
}

pub(crate) fn duplicated_message(name: &str) -> String {
    format!("'{name}' is duplicated.")
}

pub(crate) fn unknown_value_message(name: &str) -> String {
    format!("'{name}' value is unknown.")
}

pub(crate) fn unsupported_value_message(name: &str) -> String {
    format!("'{name}' value not supported.")
}

/// Parses the `token` / `token_type_hint` pair shared by introspection and
/// revocation requests.
pub(crate) fn parse_token_parameters<E>(
    parameters: &Parameters,
    invalid_request: impl Fn(String) -> E,
) -> Result<(String, Option<TokenTypeHint>), E> {
    let values = required(parameters.get("token").map(Vec::as_slice), || {
        invalid_request(required_message("token"))
    })?;
    let token = single(values, || invalid_request(duplicated_message("token")))?;

    let token_type_hint = single_or_none(
        parameters.get("token_type_hint").map(Vec::as_slice),
        || invalid_request(duplicated_message("token_type_hint")),
    )?
    .map(|value| {
        TokenTypeHint::parse(&value)
            .ok_or_else(|| invalid_request(unknown_value_message("token_type_hint")))
    })
    .transpose()?;

    Ok((token, token_type_hint))
}
