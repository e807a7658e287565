//! Transport-neutral HTTP request abstraction.
//!
//! Host adapters translate their framework's request into an [`HttpRequest`]
//! before handing it to the engine. Every parameter map is multi-valued so
//! converters can tell a missing parameter from a duplicated one.
//!
//! # Parameter helpers
//!
//! Converters validate parameters with three small combinators:
//!
//! - [`required`] fails when the parameter is absent or has no values
//! - [`single`] fails unless exactly one value is present
//! - [`single_or_none`] accepts zero or one value, fails on duplicates

use std::collections::HashMap;

/// Multi-valued parameter or header map.
pub type Parameters = HashMap<String, Vec<String>>;

/// HTTP methods understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An inbound HTTP request reduced to what the protocol logic needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Request headers.
    pub headers: Parameters,
    /// `application/x-www-form-urlencoded` body parameters.
    pub form_parameters: Parameters,
    /// Query string parameters.
    pub query_parameters: Parameters,
}

impl HttpRequest {
    /// Creates an empty request with the given method.
    #[must_use]
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            headers: Parameters::new(),
            form_parameters: Parameters::new(),
            query_parameters: Parameters::new(),
        }
    }

    /// Creates an empty `GET` request.
    #[must_use]
    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    /// Creates an empty `POST` request.
    #[must_use]
    pub fn post() -> Self {
        Self::new(HttpMethod::Post)
    }

    /// Appends a header value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Appends a form parameter value.
    #[must_use]
    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Appends a query parameter value.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Returns the values of a header, matching its name case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Returns the values of a form parameter.
    #[must_use]
    pub fn form(&self, name: &str) -> Option<&[String]> {
        self.form_parameters.get(name).map(Vec::as_slice)
    }

    /// Returns the values of a query parameter.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&[String]> {
        self.query_parameters.get(name).map(Vec::as_slice)
    }

    /// Returns the parameter map that carries the request's protocol
    /// parameters: the query string for `GET`, the form body for `POST`.
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        match self.method {
            HttpMethod::Get => &self.query_parameters,
            HttpMethod::Post => &self.form_parameters,
        }
    }
}

/// Fails with `error` when the parameter is absent or empty.
pub fn required<'a, E>(
    values: Option<&'a [String]>,
    error: impl FnOnce() -> E,
) -> Result<&'a [String], E> {
    match values {
        Some(values) if !values.is_empty() => Ok(values),
        _ => Err(error()),
    }
}

/// Collapses a value list to its only element, failing on anything else.
pub fn single<E>(values: &[String], error: impl FnOnce() -> E) -> Result<String, E> {
    match values {
        [value] => Ok(value.clone()),
        _ => Err(error()),
    }
}

/// Collapses an optional value list to zero or one element.
pub fn single_or_none<E>(
    values: Option<&[String]>,
    error: impl FnOnce() -> E,
) -> Result<Option<String>, E> {
    match values {
        None | Some([]) => Ok(None),
        Some([value]) => Ok(Some(value.clone())),
        Some(_) => Err(error()),
    }
}

/// Splits a space-delimited parameter value into its items.
#[must_use]
pub fn split_space_delimited(value: &str) -> Vec<String> {
    value
        .split(' ')
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_missing_and_empty() {
        let missing: Result<&[String], &str> = required(None, || "missing");
        assert_eq!(missing, Err("missing"));

        let empty: Vec<String> = Vec::new();
        let result: Result<&[String], &str> = required(Some(empty.as_slice()), || "missing");
        assert_eq!(result, Err("missing"));
    }

    #[test]
    fn test_single_rejects_duplicates() {
        let values = vec!["a".to_string(), "b".to_string()];
        assert_eq!(single(&values, || "dup"), Err("dup"));
        assert_eq!(single(&values[..1], || "dup"), Ok("a".to_string()));
    }

    #[test]
    fn test_single_or_none() {
        assert_eq!(single_or_none(None, || "dup"), Ok(None));

        let one = vec!["x".to_string()];
        assert_eq!(
            single_or_none(Some(one.as_slice()), || "dup"),
            Ok(Some("x".to_string()))
        );

        let two = vec!["x".to_string(), "y".to_string()];
        assert_eq!(single_or_none(Some(two.as_slice()), || "dup"), Err("dup"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest::post().with_header("authorization", "Basic abc");
        assert_eq!(
            request.header("Authorization"),
            Some(["Basic abc".to_string()].as_slice())
        );
    }

    #[test]
    fn test_parameters_follow_method() {
        let get = HttpRequest::get()
            .with_query("client_id", "foo")
            .with_form("client_id", "bar");
        assert_eq!(get.parameters()["client_id"], vec!["foo".to_string()]);

        let post = HttpRequest::post()
            .with_query("client_id", "foo")
            .with_form("client_id", "bar");
        assert_eq!(post.parameters()["client_id"], vec!["bar".to_string()]);
    }

    #[test]
    fn test_split_space_delimited() {
        assert_eq!(
            split_space_delimited("read  write"),
            vec!["read".to_string(), "write".to_string()]
        );
    }
}
