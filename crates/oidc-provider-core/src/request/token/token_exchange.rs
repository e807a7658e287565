use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ClientConfig, IssuerConfig};
use crate::http::{HttpRequest, Parameters};
use crate::metadata::{GrantType, TokenType};
use crate::request::{required_message, unknown_value_message};

use super::{TokenRequestError, optional_single, parse_grant_type, parse_scope, required_single};

/// Token exchange grant request (RFC 8693 §2.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchangeGrantRequest {
    /// Always [`GrantType::TokenExchange`].
    pub grant_type: GrantType,
    /// Absolute URIs of the target services.
    pub resource: Option<Vec<String>>,
    /// Logical names of the target services.
    pub audience: Option<Vec<String>>,
    /// Requested scopes.
    pub scope: Option<Vec<String>>,
    /// Desired type of the issued token.
    pub requested_token_type: Option<TokenType>,
    /// Token representing the party on whose behalf the request is made.
    pub subject_token: String,
    /// Type of `subject_token`.
    pub subject_token_type: TokenType,
    /// Token representing the acting party.
    pub actor_token: Option<String>,
    /// Type of `actor_token`, present iff `actor_token` is.
    pub actor_token_type: Option<TokenType>,
}

impl TokenExchangeGrantRequest {
    /// Parses the form body of `request` for the authenticated `client`.
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` or `invalid_request`.
    pub fn parse(
        issuer: &IssuerConfig,
        client: &ClientConfig,
        request: &HttpRequest,
    ) -> Result<Self, TokenRequestError> {
        let parameters = &request.form_parameters;

        let grant_type = parse_grant_type(parameters, GrantType::TokenExchange, |grant| {
            client.supported_grant_types.contains(&grant)
                && issuer.supported_grant_types.contains(&grant)
        })?;
        let resource = parse_resource(parameters)?;
        let audience = parameters
            .get("audience")
            .filter(|values| !values.is_empty())
            .cloned();
        let scope = parse_scope(parameters, |scope| {
            client.allows_scopes(scope) && issuer.allows_scopes(scope)
        })?;
        let requested_token_type = optional_single(parameters, "requested_token_type")?
            .map(|value| parse_token_type(&value, "requested_token_type"))
            .transpose()?;
        let subject_token = required_single(parameters, "subject_token")?;
        let subject_token_type = parse_token_type(
            &required_single(parameters, "subject_token_type")?,
            "subject_token_type",
        )?;
        let actor_token = optional_single(parameters, "actor_token")?;
        let actor_token_type = optional_single(parameters, "actor_token_type")?
            .map(|value| parse_token_type(&value, "actor_token_type"))
            .transpose()?;

        match (&actor_token, &actor_token_type) {
            (Some(_), None) => {
                return Err(TokenRequestError::invalid_request(required_message(
                    "actor_token_type",
                )));
            }
            (None, Some(_)) => {
                return Err(TokenRequestError::invalid_request(required_message(
                    "actor_token",
                )));
            }
            _ => {}
        }

        Ok(Self {
            grant_type,
            resource,
            audience,
            scope,
            requested_token_type,
            subject_token,
            subject_token_type,
            actor_token,
            actor_token_type,
        })
    }
}

fn parse_resource(parameters: &Parameters) -> Result<Option<Vec<String>>, TokenRequestError> {
    let Some(values) = parameters.get("resource").filter(|values| !values.is_empty()) else {
        return Ok(None);
    };

    let all_valid = values.iter().all(|value| {
        Url::parse(value).is_ok_and(|url| url.fragment().is_none())
    });

    if all_valid {
        Ok(Some(values.clone()))
    } else {
        Err(TokenRequestError::invalid_request("'resource' is invalid."))
    }
}

fn parse_token_type(value: &str, name: &str) -> Result<TokenType, TokenRequestError> {
    TokenType::parse(value)
        .ok_or_else(|| TokenRequestError::invalid_request(unknown_value_message(name)))
}
