// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::{
    header_store::HeaderStore,
    message::{HttpMessage, Message},
    method::{validate_method, Method},
    stream::SharedStream,
    uri::Uri,
    Result,
};

/// Read access and derivation for anything that is a request.
pub trait HttpRequest: HttpMessage {
    fn request(&self) -> &Request;

    fn request_mut(&mut self) -> &mut Request;

    fn method(&self) -> Method {
        self.request().method
    }

    fn uri(&self) -> &Uri {
        &self.request().uri
    }

    /// The explicitly set request target, or the origin form derived from
    /// the URI: the path followed by `?query` when there is a query, and
    /// `/` if that would be empty.
    fn request_target(&self) -> String {
        let request = self.request();
        if let Some(target) = &request.request_target {
            return target.clone();
        }

        let mut target = request.uri.path().to_string();
        if !request.uri.query().is_empty() {
            target.push('?');
            target.push_str(request.uri.query());
        }

        if target.is_empty() {
            target.push('/');
        }
        target
    }

    /// Validates the method against the allowed set.
    fn with_method(&self, method: &str) -> Result<Self> {
        let method = validate_method(method)?;
        let mut derived = self.clone();
        if method != self.method() {
            derived.request_mut().method = method;
        }
        Ok(derived)
    }

    #[must_use]
    fn with_request_target(&self, target: &str) -> Self {
        let mut derived = self.clone();
        if self.request().request_target.as_deref() != Some(target) {
            derived.request_mut().request_target = Some(target.to_string());
        }
        derived
    }

    /// Replaces the URI. The `Host` header is set from the new URI's host
    /// (and port, if any), unless `preserve_host` is requested and a `Host`
    /// header is already present. A URI without a host leaves the header
    /// alone.
    #[must_use]
    fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut derived = self.clone();
        let update_host = !uri.host().is_empty() && !(preserve_host && self.has_header("Host"));
        if update_host {
            let host = match uri.port() {
                Some(port) => format!("{}:{port}", uri.host()),
                None => uri.host().to_string(),
            };
            derived = derived.with_header("Host", host);
        }

        if uri != self.request().uri {
            derived.request_mut().uri = uri;
        }
        derived
    }
}

#[derive(Clone, Debug)]
pub struct Request {
    message: Message,
    method: Method,
    uri: Uri,
    request_target: Option<String>,
}

impl Request {
    pub fn new(message: Message, method: Method, uri: Uri) -> Self {
        Self { message, method, uri, request_target: None }
    }

    /// Creates a request with an empty in-memory body and no headers.
    pub fn create(method: &str, uri: &str) -> Result<Self> {
        Ok(Self::new(
            Message::new(SharedStream::default(), HeaderStore::new()),
            validate_method(method)?,
            Uri::parse(uri)?,
        ))
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl HttpRequest for Request {
    fn request(&self) -> &Request {
        self
    }

    fn request_mut(&mut self) -> &mut Request {
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{Error, ValidationError};

    #[rstest]
    #[case("http://example.com", "/")]
    #[case("http://example.com/", "/")]
    #[case("http://example.com/a/b", "/a/b")]
    #[case("http://example.com/a?x=1", "/a?x=1")]
    #[case("http://example.com?x=1", "?x=1")]
    #[case("http://example.com/a#frag", "/a")]
    fn test_derived_request_target(#[case] uri: &str, #[case] expected: &str) {
        let request = Request::create("GET", uri).unwrap();
        assert_eq!(request.request_target(), expected);
    }

    #[test]
    fn test_explicit_request_target() {
        let request = Request::create("OPTIONS", "http://example.com/a").unwrap();
        let derived = request.with_request_target("*");
        assert_eq!(derived.request_target(), "*");
        assert_eq!(request.request_target(), "/a");
    }

    #[test]
    fn test_with_method() {
        let request = Request::create("GET", "/").unwrap();
        let derived = request.with_method("POST").unwrap();
        assert_eq!(derived.method(), Method::Post);
        assert_eq!(request.method(), Method::Get);

        assert!(matches!(
            request.with_method("post"),
            Err(Error::Validation(ValidationError::InvalidMethod(_)))
        ));
    }

    #[test]
    fn test_create_rejects_invalid_method() {
        assert!(Request::create("FETCH", "/").is_err());
    }

    #[test]
    fn test_with_uri_updates_host() {
        let request = Request::create("GET", "http://example.com/").unwrap();
        let derived = request.with_uri(Uri::parse("http://other.org:8080/x").unwrap(), false);
        assert_eq!(derived.header_line("host"), "other.org:8080");
        assert_eq!(derived.uri().path(), "/x");
        assert!(!request.has_header("Host"));
    }

    #[test]
    fn test_with_same_uri_sets_missing_host() {
        let request = Request::create("GET", "http://example.com/").unwrap();
        let derived = request.with_uri(request.uri().clone(), false);
        assert_eq!(derived.header_line("Host"), "example.com");
        assert_eq!(derived.uri(), request.uri());
    }

    #[test]
    fn test_with_uri_preserves_existing_host() {
        let request = Request::create("GET", "http://example.com/").unwrap()
            .with_header("Host", "example.com");
        let uri = Uri::parse("http://other.org/").unwrap();

        let preserved = request.with_uri(uri.clone(), true);
        assert_eq!(preserved.header_line("Host"), "example.com");
        assert_eq!(preserved.uri().host(), "other.org");

        let replaced = request.with_uri(uri, false);
        assert_eq!(replaced.header_line("Host"), "other.org");
    }

    #[test]
    fn test_with_uri_preserve_without_host_header() {
        let request = Request::create("GET", "/").unwrap();
        let derived = request.with_uri(Uri::parse("http://other.org/").unwrap(), true);
        assert_eq!(derived.header_line("Host"), "other.org");
    }
}
