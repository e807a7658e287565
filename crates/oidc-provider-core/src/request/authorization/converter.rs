//! Authorization request converter.

use std::sync::Arc;

use crate::config::{ClientConfig, IssuerConfig};
use crate::http::{HttpRequest, Parameters, required, single, single_or_none, split_space_delimited};
use crate::metadata::{PkceCodeChallengeMethod, ResponseMode, ResponseType};
use crate::request::{
    duplicated_message, required_message, unknown_value_message, unsupported_value_message,
};
use crate::storage::ClientConfigStorage;

use super::{AuthorizationErrorCode, AuthorizationRequest, AuthorizationRequestError};

/// Parses and validates authorization endpoint requests.
///
/// Parameters are read from the query string for `GET` and from the form
/// body for `POST`. Until the client and its redirect URI are known, errors
/// are not redirectable.
#[derive(Clone)]
pub struct AuthorizationRequestConverter {
    clients: Arc<dyn ClientConfigStorage>,
}

impl AuthorizationRequestConverter {
    /// Creates a converter resolving clients through `clients`.
    pub fn new(clients: Arc<dyn ClientConfigStorage>) -> Self {
        Self { clients }
    }

    /// Converts `request` into an [`AuthorizationRequest`] for `issuer`,
    /// returned with the client it names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` / `InvalidRedirectUri` when no safe redirect
    /// target exists, otherwise a redirectable `ErrorResponse`.
    pub async fn convert(
        &self,
        issuer: &IssuerConfig,
        request: &HttpRequest,
    ) -> Result<(AuthorizationRequest, ClientConfig), AuthorizationRequestError> {
        let parameters = request.parameters();

        let client = self.convert_client(issuer, parameters).await?;
        let redirect_uri = convert_redirect_uri(&client, parameters)?;
        let state = single_or_none(parameters.get("state").map(Vec::as_slice), || {
            AuthorizationRequestError::error_response(
                redirect_uri.clone(),
                AuthorizationErrorCode::InvalidRequest,
                duplicated_message("state"),
                None,
            )
        })?;

        let context = ErrorContext {
            redirect_uri: &redirect_uri,
            state: state.as_deref(),
        };

        let response_type = convert_response_type(issuer, parameters, &context)?;
        let scope = convert_scope(issuer, &client, parameters, &context)?;
        let response_mode = convert_response_mode(parameters, &context)?;
        let code_challenge = convert_code_challenge(issuer, parameters, &context)?;
        let code_challenge_method = convert_code_challenge_method(issuer, parameters, &context)?;

        let converted = AuthorizationRequest {
            response_type,
            client_id: client.id.clone(),
            redirect_uri,
            scope,
            state,
            response_mode,
            code_challenge,
            code_challenge_method,
        };
        Ok((converted, client))
    }

    async fn convert_client(
        &self,
        issuer: &IssuerConfig,
        parameters: &Parameters,
    ) -> Result<ClientConfig, AuthorizationRequestError> {
        let values = required(parameters.get("client_id").map(Vec::as_slice), || {
            AuthorizationRequestError::invalid_client(required_message("client_id"))
        })?;
        let client_id = single(values, || {
            AuthorizationRequestError::invalid_client(duplicated_message("client_id"))
        })?;

        self.clients
            .find_by_id(&issuer.issuer, &client_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(issuer = %issuer.issuer, client_id = %client_id, "Unknown client in authorization request");
                AuthorizationRequestError::invalid_client("Client does not exist.")
            })
    }
}

/// Redirect target and state for errors raised after the redirect URI is known.
struct ErrorContext<'a> {
    redirect_uri: &'a str,
    state: Option<&'a str>,
}

impl ErrorContext<'_> {
    fn error(
        &self,
        code: AuthorizationErrorCode,
        description: impl Into<String>,
    ) -> AuthorizationRequestError {
        AuthorizationRequestError::error_response(
            self.redirect_uri,
            code,
            description,
            self.state.map(str::to_string),
        )
    }

    fn invalid_request(&self, description: impl Into<String>) -> AuthorizationRequestError {
        self.error(AuthorizationErrorCode::InvalidRequest, description)
    }
}

fn convert_redirect_uri(
    client: &ClientConfig,
    parameters: &Parameters,
) -> Result<String, AuthorizationRequestError> {
    let values = required(parameters.get("redirect_uri").map(Vec::as_slice), || {
        AuthorizationRequestError::invalid_redirect_uri(required_message("redirect_uri"))
    })?;
    let redirect_uri = single(values, || {
        AuthorizationRequestError::invalid_redirect_uri(duplicated_message("redirect_uri"))
    })?;

    if client.has_redirect_uri(&redirect_uri) {
        Ok(redirect_uri)
    } else {
        tracing::warn!(client_id = %client.id, "Unregistered redirect_uri in authorization request");
        Err(AuthorizationRequestError::invalid_redirect_uri(
            "'redirect_uri' value is not registered.",
        ))
    }
}

fn convert_response_type(
    issuer: &IssuerConfig,
    parameters: &Parameters,
    context: &ErrorContext<'_>,
) -> Result<Vec<ResponseType>, AuthorizationRequestError> {
    let values = required(parameters.get("response_type").map(Vec::as_slice), || {
        context.invalid_request(required_message("response_type"))
    })?;
    let value = single(values, || {
        context.invalid_request(duplicated_message("response_type"))
    })?;

    let response_type = split_space_delimited(&value)
        .iter()
        .map(|item| {
            ResponseType::parse(item).ok_or_else(|| {
                context.error(
                    AuthorizationErrorCode::UnsupportedResponseType,
                    unknown_value_message("response_type"),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if response_type.is_empty() {
        return Err(context.invalid_request(required_message("response_type")));
    }

    if !response_type
        .iter()
        .all(|item| issuer.supported_response_types.contains(item))
    {
        return Err(context.error(
            AuthorizationErrorCode::UnsupportedResponseType,
            unsupported_value_message("response_type"),
        ));
    }

    Ok(response_type)
}

fn convert_scope(
    issuer: &IssuerConfig,
    client: &ClientConfig,
    parameters: &Parameters,
    context: &ErrorContext<'_>,
) -> Result<Option<Vec<String>>, AuthorizationRequestError> {
    let Some(value) = single_or_none(parameters.get("scope").map(Vec::as_slice), || {
        context.invalid_request(duplicated_message("scope"))
    })?
    else {
        return Ok(None);
    };

    let scope = split_space_delimited(&value);
    if !client.allows_scopes(&scope) || !issuer.allows_scopes(&scope) {
        return Err(context.invalid_request(unsupported_value_message("scope")));
    }

    Ok(Some(scope))
}

fn convert_response_mode(
    parameters: &Parameters,
    context: &ErrorContext<'_>,
) -> Result<Option<ResponseMode>, AuthorizationRequestError> {
    single_or_none(parameters.get("response_mode").map(Vec::as_slice), || {
        context.invalid_request(duplicated_message("response_mode"))
    })?
    .map(|value| {
        ResponseMode::parse(&value)
            .ok_or_else(|| context.invalid_request(unknown_value_message("response_mode")))
    })
    .transpose()
}

fn convert_code_challenge(
    issuer: &IssuerConfig,
    parameters: &Parameters,
    context: &ErrorContext<'_>,
) -> Result<Option<String>, AuthorizationRequestError> {
    let code_challenge = single_or_none(
        parameters.get("code_challenge").map(Vec::as_slice),
        || context.invalid_request(duplicated_message("code_challenge")),
    )?;

    if issuer.required_pkce && code_challenge.is_none() {
        return Err(context.invalid_request(required_message("code_challenge")));
    }

    Ok(code_challenge)
}

fn convert_code_challenge_method(
    issuer: &IssuerConfig,
    parameters: &Parameters,
    context: &ErrorContext<'_>,
) -> Result<Option<PkceCodeChallengeMethod>, AuthorizationRequestError> {
    let Some(value) = single_or_none(
        parameters.get("code_challenge_method").map(Vec::as_slice),
        || context.invalid_request(duplicated_message("code_challenge_method")),
    )?
    else {
        return Ok(None);
    };

    let method = PkceCodeChallengeMethod::parse(&value)
        .ok_or_else(|| context.invalid_request(unknown_value_message("code_challenge_method")))?;

    if !issuer.supported_code_challenge_methods.contains(&method) {
        return Err(context.invalid_request(unsupported_value_message("code_challenge_method")));
    }

    Ok(Some(method))
}
