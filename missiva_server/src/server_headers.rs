// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use indexmap::IndexMap;
use missiva_http::{Error, Result};
use tracing::trace;

use crate::{
    raw_value::RawValue,
    server_data::{ServerParam, ServerParams},
};

const HEADER_PREFIX: &str = "HTTP_";

/// Request headers grouped by name, in the order they were received.
pub type GroupedHeaders = IndexMap<String, Vec<String>>;

/// Something that can list the request headers as the web server received
/// them, with the names as the server reports them.
pub trait HeaderSource: Send + Sync {
    fn header_entries(&self) -> Vec<(String, RawValue)>;
}

impl HeaderSource for IndexMap<String, RawValue> {
    fn header_entries(&self) -> Vec<(String, RawValue)> {
        self.iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl HeaderSource for Vec<(String, RawValue)> {
    fn header_entries(&self) -> Vec<(String, RawValue)> {
        self.clone()
    }
}

/// Derives the header name from a server variable name: `HTTP_` is
/// stripped, each `_`-separated word is capitalized and the words are
/// joined without a separator, so `HTTP_USER_AGENT` becomes `UserAgent`.
pub fn parse_header_field(field: &str) -> Result<String> {
    let Some(name) = field.strip_prefix(HEADER_PREFIX) else {
        return Err(Error::type_mismatch(format!("`{field}` is not a header field")));
    };

    Ok(name.to_lowercase()
        .split('_')
        .map(capitalize)
        .collect())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collects the headers from the `HTTP_*` entries of the server
/// parameters. Every such entry must be a string.
pub fn parse_server_headers(server_params: &ServerParams) -> Result<GroupedHeaders> {
    let mut headers = GroupedHeaders::new();

    for (key, value) in server_params {
        if !key.starts_with(HEADER_PREFIX) {
            continue;
        }

        let ServerParam::String(value) = value else {
            return Err(Error::type_mismatch(format!("header variable `{key}` is not a string")));
        };

        let name = parse_header_field(key)?;
        trace!("header {name} derived from {key}");
        headers.entry(name).or_default().push(value.clone());
    }

    Ok(headers)
}

/// Collects the headers reported by a [`HeaderSource`]. Values must be
/// scalars and are converted to strings.
pub fn parse_header_source(source: &dyn HeaderSource) -> Result<GroupedHeaders> {
    let mut headers = GroupedHeaders::new();

    for (name, value) in source.header_entries() {
        let Some(value) = value.scalar_to_string() else {
            return Err(Error::type_mismatch(format!(
                "header `{name}` is not a scalar, got {}", value.type_name()
            )));
        };
        headers.entry(name).or_default().push(value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("HTTP_USER_AGENT", "UserAgent")]
    #[case("HTTP_ACCEPT", "Accept")]
    #[case("HTTP_X_FORWARDED_FOR", "XForwardedFor")]
    #[case("HTTP_HOST", "Host")]
    #[case("HTTP_content_TYPE", "ContentType")]
    fn test_parse_header_field(#[case] field: &str, #[case] expected: &str) {
        assert_eq!(parse_header_field(field).unwrap(), expected);
    }

    #[rstest]
    #[case("USER_AGENT")]
    #[case("http_user_agent")]
    #[case("REQUEST_METHOD")]
    fn test_not_a_header_field(#[case] field: &str) {
        assert!(matches!(parse_header_field(field), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_parse_server_headers() {
        let mut params = ServerParams::new();
        params.insert(String::from("REQUEST_METHOD"), ServerParam::String(String::from("GET")));
        params.insert(String::from("HTTP_HOST"), ServerParam::String(String::from("example.com")));
        params.insert(String::from("HTTP_USER_AGENT"), ServerParam::String(String::from("curl/8.0")));
        params.insert(String::from("REQUEST_TIME"), ServerParam::Int(0));

        let headers = parse_server_headers(&params).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["Host"], ["example.com"]);
        assert_eq!(headers["UserAgent"], ["curl/8.0"]);
    }

    #[test]
    fn test_non_string_header_variable() {
        let mut params = ServerParams::new();
        params.insert(String::from("HTTP_DNT"), ServerParam::Int(1));
        assert!(matches!(parse_server_headers(&params), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_parse_header_source() {
        let source: Vec<(String, RawValue)> = vec![
            (String::from("Host"), RawValue::from("example.com")),
            (String::from("Content-Length"), RawValue::Int(42)),
            (String::from("X-Forwarded-For"), RawValue::from("10.0.0.1")),
            (String::from("X-Forwarded-For"), RawValue::from("10.0.0.2")),
        ];

        let headers = parse_header_source(&source).unwrap();
        assert_eq!(headers["Content-Length"], ["42"]);
        assert_eq!(headers["X-Forwarded-For"], ["10.0.0.1", "10.0.0.2"]);
        assert_eq!(headers.get_index(0).map(|(name, _)| name.as_str()), Some("Host"));
    }

    #[test]
    fn test_non_scalar_header_source_value() {
        let mut source = IndexMap::new();
        source.insert(String::from("Accept"), RawValue::list(["text/html"]));
        assert!(matches!(parse_header_source(&source), Err(Error::TypeMismatch(_))));
    }
}
