//! OpenID Connect authentication requests (OIDC Core §3.1.2.1).
//!
//! An authentication request is an authorization request whose scope
//! contains `openid`. It reuses the client and redirect URI already validated
//! by the authorization converter, so every error here is redirectable.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::{HttpRequest, Parameters, single_or_none, split_space_delimited};
use crate::metadata::{Display, Prompt, ResponseMode, ResponseType};
use crate::request::authorization::{AuthorizationRequest, AuthorizationRequestError};
use crate::request::{duplicated_message, unknown_value_message};

/// Scope value that turns an authorization request into an authentication
/// request.
pub const OPENID_SCOPE: &str = "openid";

/// A validated OpenID Connect authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRequest {
    /// Requested scopes, always containing `openid`.
    pub scope: Vec<String>,
    /// Requested response types.
    pub response_type: Vec<ResponseType>,
    /// Requesting client.
    pub client_id: String,
    /// Redirect target.
    pub redirect_uri: String,
    /// Client state.
    pub state: Option<String>,
    /// Requested response mode.
    pub response_mode: Option<ResponseMode>,
    /// Value echoed in the ID token to mitigate replay.
    pub nonce: Option<String>,
    /// How the login/consent UI should be displayed.
    pub display: Option<Display>,
    /// Whether to prompt for reauthentication or consent.
    pub prompt: Option<Vec<Prompt>>,
    /// Maximum authentication age in seconds.
    pub max_age: Option<i64>,
    /// Preferred UI languages.
    pub ui_locales: Option<String>,
    /// Previously issued ID token hinting at the current session.
    pub id_token_hint: Option<String>,
    /// Login identifier hint.
    pub login_hint: Option<String>,
    /// Requested Authentication Context Class References.
    pub acr_values: Option<String>,
}

impl AuthenticationRequest {
    /// Parses the OpenID Connect parameters of `request`.
    ///
    /// Returns `Ok(None)` when `authorization_request` does not request the
    /// `openid` scope.
    ///
    /// # Errors
    ///
    /// Returns a redirectable `AuthenticationErrorResponse` for duplicated or
    /// unknown parameter values.
    pub fn parse(
        authorization_request: &AuthorizationRequest,
        request: &HttpRequest,
    ) -> Result<Option<Self>, AuthorizationRequestError> {
        if !authorization_request.has_scope(OPENID_SCOPE) {
            return Ok(None);
        }

        let parameters = request.parameters();
        let context = ErrorContext {
            redirect_uri: &authorization_request.redirect_uri,
            state: authorization_request.state.as_deref(),
        };

        let nonce = optional_single(parameters, "nonce", &context)?;
        let display = optional_single(parameters, "display", &context)?
            .map(|value| {
                Display::parse(&value)
                    .ok_or_else(|| context.invalid_request(unknown_value_message("display")))
            })
            .transpose()?;
        let prompt = optional_single(parameters, "prompt", &context)?
            .map(|value| {
                split_space_delimited(&value)
                    .iter()
                    .map(|item| {
                        Prompt::parse(item)
                            .ok_or_else(|| context.invalid_request(unknown_value_message("prompt")))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let max_age = optional_single(parameters, "max_age", &context)?
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| context.invalid_request("'max_age' is invalid value."))
            })
            .transpose()?;
        let ui_locales = optional_single(parameters, "ui_locales", &context)?;
        let id_token_hint = optional_single(parameters, "id_token_hint", &context)?;
        let login_hint = optional_single(parameters, "login_hint", &context)?;
        let acr_values = optional_single(parameters, "acr_values", &context)?;

        Ok(Some(Self {
            scope: authorization_request.scope.clone().unwrap_or_default(),
            response_type: authorization_request.response_type.clone(),
            client_id: authorization_request.client_id.clone(),
            redirect_uri: authorization_request.redirect_uri.clone(),
            state: authorization_request.state.clone(),
            response_mode: authorization_request.response_mode,
            nonce,
            display,
            prompt,
            max_age,
            ui_locales,
            id_token_hint,
            login_hint,
            acr_values,
        }))
    }

    /// Returns `true` if `prompt` contains `value`.
    #[must_use]
    pub fn prompts(&self, value: Prompt) -> bool {
        self.prompt
            .as_ref()
            .is_some_and(|prompt| prompt.contains(&value))
    }
}

struct ErrorContext<'a> {
    redirect_uri: &'a str,
    state: Option<&'a str>,
}

impl ErrorContext<'_> {
    fn invalid_request(&self, description: impl Into<String>) -> AuthorizationRequestError {
        AuthorizationRequestError::authentication_error_response(
            self.redirect_uri,
            AuthenticationErrorCode::InvalidRequest,
            description,
            self.state.map(str::to_string),
        )
    }
}

fn optional_single(
    parameters: &Parameters,
    name: &str,
    context: &ErrorContext<'_>,
) -> Result<Option<String>, AuthorizationRequestError> {
    single_or_none(parameters.get(name).map(Vec::as_slice), || {
        context.invalid_request(duplicated_message(name))
    })
}

// =============================================================================
// Error codes
// =============================================================================

/// Authentication error codes (OIDC Core §3.1.2.6), a superset of the
/// OAuth 2.0 authorization error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationErrorCode {
    /// Malformed or missing parameter.
    InvalidRequest,
    /// Client may not use this response type.
    UnauthorizedClient,
    /// Resource owner denied the request.
    AccessDenied,
    /// Response type not supported.
    UnsupportedResponseType,
    /// Scope invalid or unknown.
    InvalidScope,
    /// Unexpected server condition.
    ServerError,
    /// Server temporarily unable to handle the request.
    TemporaryUnavailable,
    /// `prompt=none` but user interaction is needed.
    InteractionRequired,
    /// `prompt=none` but the user must log in.
    LoginRequired,
    /// `prompt=none` but the user must pick a session.
    AccountSelectionRequired,
    /// `prompt=none` but the user must consent.
    ConsentRequired,
    /// `request_uri` returned an error or invalid data.
    InvalidRequestUri,
    /// `request` contains an invalid request object.
    InvalidRequestObject,
    /// `request` is not supported.
    RequestNotSupported,
    /// `request_uri` is not supported.
    RequestUriNotSupported,
    /// `registration` is not supported.
    RegistrationNotSupported,
}

impl AuthenticationErrorCode {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporaryUnavailable => "temporary_unavailable",
            Self::InteractionRequired => "interaction_required",
            Self::LoginRequired => "login_required",
            Self::AccountSelectionRequired => "account_selection_required",
            Self::ConsentRequired => "consent_required",
            Self::InvalidRequestUri => "invalid_request_uri",
            Self::InvalidRequestObject => "invalid_request_object",
            Self::RequestNotSupported => "request_not_supported",
            Self::RequestUriNotSupported => "request_uri_not_supported",
            Self::RegistrationNotSupported => "registration_not_supported",
        }
    }
}

impl fmt::Display for AuthenticationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorization_request(scope: Option<&str>) -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: vec![ResponseType::Code],
            client_id: "foo".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            scope: scope.map(split_space_delimited),
            state: Some("xyz".to_string()),
            response_mode: None,
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    fn expect_description(
        result: Result<Option<AuthenticationRequest>, AuthorizationRequestError>,
        expected: &str,
    ) {
        match result {
            Err(AuthorizationRequestError::AuthenticationErrorResponse {
                error,
                error_description,
                state,
                ..
            }) => {
                assert_eq!(error, AuthenticationErrorCode::InvalidRequest);
                assert_eq!(error_description.as_deref(), Some(expected));
                assert_eq!(state.as_deref(), Some("xyz"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_without_openid_scope() {
        let request = HttpRequest::get().with_query("nonce", "n1");
        let parsed = AuthenticationRequest::parse(&authorization_request(Some("read")), &request);
        assert!(matches!(parsed, Ok(None)));

        let parsed = AuthenticationRequest::parse(&authorization_request(None), &request);
        assert!(matches!(parsed, Ok(None)));
    }

    #[test]
    fn test_parse_all_parameters() {
        let request = HttpRequest::get()
            .with_query("nonce", "n1")
            .with_query("display", "popup")
            .with_query("prompt", "login consent")
            .with_query("max_age", "300")
            .with_query("ui_locales", "ja en")
            .with_query("login_hint", "alice")
            .with_query("acr_values", "urn:mace:incommon:iap:silver");

        let parsed = AuthenticationRequest::parse(&authorization_request(Some("openid")), &request)
            .unwrap()
            .unwrap();

        assert_eq!(parsed.scope, vec!["openid".to_string()]);
        assert_eq!(parsed.nonce.as_deref(), Some("n1"));
        assert_eq!(parsed.display, Some(Display::Popup));
        assert_eq!(parsed.prompt, Some(vec![Prompt::Login, Prompt::Consent]));
        assert!(parsed.prompts(Prompt::Consent));
        assert!(!parsed.prompts(Prompt::None));
        assert_eq!(parsed.max_age, Some(300));
        assert_eq!(parsed.ui_locales.as_deref(), Some("ja en"));
        assert_eq!(parsed.login_hint.as_deref(), Some("alice"));
        assert!(parsed.id_token_hint.is_none());
        assert_eq!(parsed.redirect_uri, "http://localhost/cb");
    }

    #[test]
    fn test_unknown_display() {
        let request = HttpRequest::get().with_query("display", "tv");
        expect_description(
            AuthenticationRequest::parse(&authorization_request(Some("openid")), &request),
            "'display' value is unknown.",
        );
    }

    #[test]
    fn test_unknown_prompt() {
        let request = HttpRequest::get().with_query("prompt", "login create");
        expect_description(
            AuthenticationRequest::parse(&authorization_request(Some("openid")), &request),
            "'prompt' value is unknown.",
        );
    }

    #[test]
    fn test_invalid_max_age() {
        let request = HttpRequest::get().with_query("max_age", "ten");
        expect_description(
            AuthenticationRequest::parse(&authorization_request(Some("openid")), &request),
            "'max_age' is invalid value.",
        );
    }

    #[test]
    fn test_duplicated_nonce() {
        let request = HttpRequest::get()
            .with_query("nonce", "a")
            .with_query("nonce", "b");
        expect_description(
            AuthenticationRequest::parse(&authorization_request(Some("openid")), &request),
            "'nonce' is duplicated.",
        );
    }
}
