// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use missiva_http::{validate_method, Error, Method, Result, Uri, ValidationError};
use tracing::warn;

use crate::{
    config::ServerRequestSettings,
    raw_value::RawMap,
    server_data::{parse_server_params, ServerParam, ServerParams},
};

const SUPPORTED_SERVER_PROTOCOLS: [&str; 2] = ["HTTP/1.1", "HTTP/2.0"];

/// Determines the method and URI of a request from the server variables.
#[derive(Debug)]
pub struct ServerParamsProcessor<'a> {
    params: ServerParams,
    settings: &'a ServerRequestSettings,
}

impl<'a> ServerParamsProcessor<'a> {
    pub fn new(raw_params: &RawMap, settings: &'a ServerRequestSettings) -> Result<Self> {
        Ok(Self {
            params: parse_server_params(raw_params)?,
            settings,
        })
    }

    #[must_use]
    pub fn params(&self) -> &ServerParams {
        &self.params
    }

    #[must_use]
    pub fn into_params(self) -> ServerParams {
        self.params
    }

    /// The request method from `REQUEST_METHOD`. Its absence usually means
    /// the process was not started by a web server.
    pub fn process_method(&self) -> Result<Method> {
        match self.params.get("REQUEST_METHOD") {
            Some(ServerParam::String(method)) => validate_method(method),
            Some(_) => Err(Error::type_mismatch("request method is not a string")),
            None => Err(Error::logic("unable to determine the request method")),
        }
    }

    /// Builds `{scheme}://{SERVER_NAME}{REQUEST_URI}`.
    pub fn process_uri(&self) -> Result<Uri> {
        let scheme = self.request_scheme()?;
        let server_name = self.server_name()?;
        let request_uri = self.string_value("REQUEST_URI")?;

        Uri::parse(&format!("{scheme}://{server_name}{request_uri}"))
    }

    fn request_scheme(&self) -> Result<&'static str> {
        // The protocol of the server, not necessarily the one the client used.
        let protocol = self.string_value("SERVER_PROTOCOL")?;
        if !SUPPORTED_SERVER_PROTOCOLS.contains(&protocol) {
            warn!("unsupported server protocol {protocol}");
            return Err(ValidationError::UnsupportedServerProtocol(protocol.to_string()).into());
        }

        if self.is_https()? || self.is_forwarded_ssl()? {
            Ok("https")
        } else {
            Ok("http")
        }
    }

    fn server_name(&self) -> Result<&str> {
        let server_name = self.string_value("SERVER_NAME")?;
        if !self.settings.is_host_allowed(server_name) {
            warn!("host {server_name} is not in the allowed hosts list");
            return Err(ValidationError::HostNotAllowed(server_name.to_string()).into());
        }
        Ok(server_name)
    }

    fn string_value(&self, key: &str) -> Result<&str> {
        match self.params.get(key) {
            Some(ServerParam::String(value)) => Ok(value),
            Some(_) => Err(Error::type_mismatch(format!("server parameter `{key}` is not a string"))),
            None => Err(Error::not_found(format!("server parameter `{key}` is missing"))),
        }
    }

    /// A missing indicator counts as `off`.
    fn flag_is_on(&self, key: &str) -> Result<bool> {
        match self.string_value(key) {
            Ok(value) => Ok(value == "on"),
            Err(Error::NotFound(_)) => Ok(false),
            Err(error) => Err(error),
        }
    }

    fn is_https(&self) -> Result<bool> {
        self.flag_is_on("HTTPS")
    }

    fn is_forwarded_ssl(&self) -> Result<bool> {
        self.flag_is_on("HTTP_X_FORWARDED_SSL")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::raw_value::RawValue;

    fn server(entries: &[(&str, RawValue)]) -> RawMap {
        entries.iter()
            .map(|(key, value)| ((*key).into(), value.clone()))
            .collect()
    }

    fn base_entries() -> Vec<(&'static str, RawValue)> {
        vec![
            ("REQUEST_METHOD", RawValue::from("GET")),
            ("SERVER_PROTOCOL", RawValue::from("HTTP/1.1")),
            ("SERVER_NAME", RawValue::from("example.com")),
            ("REQUEST_URI", RawValue::from("/path?x=1")),
        ]
    }

    fn settings() -> ServerRequestSettings {
        ServerRequestSettings::new().with_allowed_hosts(["example.com"])
    }

    fn process_uri(entries: &[(&str, RawValue)]) -> Result<Uri> {
        let settings = settings();
        ServerParamsProcessor::new(&server(entries), &settings)?.process_uri()
    }

    #[test]
    fn test_plain_http() {
        let uri = process_uri(&base_entries()).unwrap();
        assert_eq!(uri.to_string(), "http://example.com/path?x=1");
    }

    #[rstest]
    #[case("HTTPS", "on", "https")]
    #[case("HTTPS", "off", "http")]
    #[case("HTTPS", "", "http")]
    #[case("HTTP_X_FORWARDED_SSL", "on", "https")]
    #[case("HTTP_X_FORWARDED_SSL", "1", "http")]
    fn test_scheme(#[case] key: &'static str, #[case] value: &str, #[case] expected: &str) {
        let mut entries = base_entries();
        entries.push((key, RawValue::from(value)));
        assert_eq!(process_uri(&entries).unwrap().scheme(), expected);
    }

    #[test]
    fn test_non_string_https_flag() {
        let mut entries = base_entries();
        entries.push(("HTTPS", RawValue::Bool(true)));
        assert!(matches!(process_uri(&entries), Err(Error::TypeMismatch(_))));
    }

    #[rstest]
    #[case("HTTP/1.0")]
    #[case("HTTP/3")]
    #[case("INCLUDED")]
    fn test_unsupported_protocol(#[case] protocol: &str) {
        let mut entries = base_entries();
        entries[1] = ("SERVER_PROTOCOL", RawValue::from(protocol));
        assert!(matches!(
            process_uri(&entries),
            Err(Error::Validation(ValidationError::UnsupportedServerProtocol(_)))
        ));
    }

    #[test]
    fn test_host_not_allowed() {
        let mut entries = base_entries();
        entries[2] = ("SERVER_NAME", RawValue::from("evil.com"));
        match process_uri(&entries) {
            Err(Error::Validation(ValidationError::HostNotAllowed(host))) => assert_eq!(host, "evil.com"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_request_uri() {
        let mut entries = base_entries();
        entries.pop();
        assert!(matches!(process_uri(&entries), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_method() {
        let settings = settings();
        let processor = ServerParamsProcessor::new(&server(&base_entries()), &settings).unwrap();
        assert_eq!(processor.process_method().unwrap(), Method::Get);

        let processor = ServerParamsProcessor::new(&server(&[]), &settings).unwrap();
        assert!(matches!(processor.process_method(), Err(Error::Logic(_))));

        let entries = [("REQUEST_METHOD", RawValue::Int(1))];
        let processor = ServerParamsProcessor::new(&server(&entries), &settings).unwrap();
        assert!(matches!(processor.process_method(), Err(Error::TypeMismatch(_))));

        let entries = [("REQUEST_METHOD", RawValue::from("BREW"))];
        let processor = ServerParamsProcessor::new(&server(&entries), &settings).unwrap();
        assert!(matches!(processor.process_method(), Err(Error::Validation(_))));
    }
}
