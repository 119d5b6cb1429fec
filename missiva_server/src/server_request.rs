// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{any::Any, fmt, sync::Arc};

use hashbrown::HashMap;
use missiva_http::{
    validate_method,
    HeaderStore,
    HttpMessage,
    HttpRequest,
    Message,
    Method,
    Request,
    Result,
    SharedStream,
    Uri,
};

use crate::{
    raw_value::{RawMap, RawValue},
    server_data::{
        parse_body_data,
        parse_cookie_query_params,
        parse_server_params,
        Params,
        ParsedBody,
        ServerParams,
    },
    server_headers::{parse_header_source, parse_server_headers, HeaderSource},
    uploaded_file_parser::{parse_uploaded_files, UploadedFiles},
};

/// A value stored in the attributes of a [`ServerRequest`].
pub type Attribute = Arc<dyn Any + Send + Sync>;

/// An incoming request as seen by the server, together with everything the
/// web server decoded for it.
///
/// Attributes hold whatever request-local state the application derives
/// while handling the request, e.g. route parameters.
#[derive(Clone)]
pub struct ServerRequest {
    request: Request,
    server_params: Arc<ServerParams>,
    cookie_params: Arc<Params>,
    query_params: Arc<Params>,
    parsed_body: ParsedBody,
    uploaded_files: Arc<UploadedFiles>,
    attributes: Arc<HashMap<String, Attribute>>,
}

impl ServerRequest {
    /// Creates a request with an empty body. The headers are taken from the
    /// header source if there is one, and from the `HTTP_*` server
    /// parameters otherwise.
    pub fn new(
        method: Method,
        uri: Uri,
        server_params: ServerParams,
        header_source: Option<&dyn HeaderSource>,
    ) -> Result<Self> {
        let headers = match header_source {
            Some(source) => parse_header_source(source)?,
            None => parse_server_headers(&server_params)?,
        };

        let message = Message::new(SharedStream::default(), HeaderStore::from_grouped(headers));

        Ok(Self {
            request: Request::new(message, method, uri),
            server_params: Arc::new(server_params),
            cookie_params: Arc::default(),
            query_params: Arc::default(),
            parsed_body: ParsedBody::None,
            uploaded_files: Arc::default(),
            attributes: Arc::default(),
        })
    }

    /// Validates and parses the given values before creating the request.
    pub fn create(
        method: &str,
        uri: &str,
        server_params: &RawMap,
        header_source: Option<&dyn HeaderSource>,
    ) -> Result<Self> {
        Self::new(
            validate_method(method)?,
            Uri::parse(uri)?,
            parse_server_params(server_params)?,
            header_source,
        )
    }

    #[must_use]
    pub fn server_params(&self) -> &ServerParams {
        &self.server_params
    }

    #[must_use]
    pub fn cookie_params(&self) -> &Params {
        &self.cookie_params
    }

    #[must_use]
    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    #[must_use]
    pub fn parsed_body(&self) -> &ParsedBody {
        &self.parsed_body
    }

    #[must_use]
    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.uploaded_files
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Attribute> {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Returns the attribute if it is present and of type `T`.
    #[must_use]
    pub fn attribute_as<T: Any>(&self, name: &str) -> Option<&T> {
        self.attribute(name).and_then(|value| value.downcast_ref())
    }

    /// Returns the attribute, or `default` when it is absent or not a `T`.
    #[must_use]
    pub fn attribute_or<T: Any + Clone>(&self, name: &str, default: T) -> T {
        self.attribute_as(name).cloned().unwrap_or(default)
    }

    #[must_use]
    pub fn with_attribute(&self, name: &str, value: impl Any + Send + Sync) -> Self {
        let mut derived = self.clone();
        Arc::make_mut(&mut derived.attributes).insert(name.to_string(), Arc::new(value));
        derived
    }

    #[must_use]
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut derived = self.clone();
        if self.attributes.contains_key(name) {
            Arc::make_mut(&mut derived.attributes).remove(name);
        }
        derived
    }

    /// Cookie values must be strings, possibly nested.
    pub fn with_cookie_params(&self, cookies: &RawMap) -> Result<Self> {
        Ok(Self {
            cookie_params: Arc::new(parse_cookie_query_params(cookies)?),
            ..self.clone()
        })
    }

    /// Query values must be strings, possibly nested.
    pub fn with_query_params(&self, query: &RawMap) -> Result<Self> {
        Ok(Self {
            query_params: Arc::new(parse_cookie_query_params(query)?),
            ..self.clone()
        })
    }

    /// Accepts form fields with string names and values, an object, or null.
    pub fn with_parsed_body(&self, data: &RawValue) -> Result<Self> {
        Ok(Self {
            parsed_body: parse_body_data(data)?,
            ..self.clone()
        })
    }

    /// Every field must map to a list of uploaded files.
    pub fn with_uploaded_files(&self, uploaded_files: &RawMap) -> Result<Self> {
        Ok(self.with_uploaded_file_tree(parse_uploaded_files(uploaded_files)?))
    }

    #[must_use]
    pub fn with_uploaded_file_tree(&self, uploaded_files: UploadedFiles) -> Self {
        Self {
            uploaded_files: Arc::new(uploaded_files),
            ..self.clone()
        }
    }
}

impl HttpMessage for ServerRequest {
    fn message(&self) -> &Message {
        self.request.message()
    }

    fn message_mut(&mut self) -> &mut Message {
        self.request.message_mut()
    }
}

impl HttpRequest for ServerRequest {
    fn request(&self) -> &Request {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }
}

impl fmt::Debug for ServerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRequest")
            .field("request", &self.request)
            .field("server_params", &self.server_params)
            .field("cookie_params", &self.cookie_params)
            .field("query_params", &self.query_params)
            .field("parsed_body", &self.parsed_body)
            .field("uploaded_files", &self.uploaded_files)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use missiva_http::{create_uploaded_file, Error, Stream};

    use super::*;

    fn raw(value: RawValue) -> RawMap {
        match value {
            RawValue::Map(map) => map,
            other => panic!("expected a map, got {other:?}"),
        }
    }

    fn server_request() -> ServerRequest {
        let server = raw(RawValue::map([
            ("HTTP_HOST", "example.com"),
            ("HTTP_USER_AGENT", "curl/8.0"),
            ("HTTP_ACCEPT", "*/*"),
        ]));
        ServerRequest::create("GET", "http://example.com/", &server, None).unwrap()
    }

    #[test]
    fn test_headers_from_server_params() {
        let request = server_request();
        assert_eq!(request.header_line("host"), "example.com");
        assert_eq!(request.header_line("useragent"), "curl/8.0");
        assert!(request.headers().contains_key("UserAgent"));
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.request_target(), "/");
    }

    #[test]
    fn test_headers_from_header_source() {
        let mut source = IndexMap::new();
        source.insert(String::from("User-Agent"), RawValue::from("curl/8.0"));
        source.insert(String::from("Content-Length"), RawValue::Int(3));

        let server = raw(RawValue::map([("HTTP_USER_AGENT", "ignored")]));
        let request = ServerRequest::create(
            "POST", "http://example.com/", &server, Some(&source as &dyn HeaderSource),
        ).unwrap();

        assert_eq!(request.header_line("user-agent"), "curl/8.0");
        assert_eq!(request.header_line("content-length"), "3");
        assert!(!request.has_header("UserAgent"));
    }

    #[test]
    fn test_invalid_header_source_value() {
        let mut source = IndexMap::new();
        source.insert(String::from("Accept"), RawValue::Null);
        let result = ServerRequest::create(
            "GET", "/", &RawMap::new(), Some(&source as &dyn HeaderSource),
        );
        assert!(matches!(result, Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_attributes() {
        let request = server_request();
        let derived = request.with_attribute("route", String::from("home"));

        assert_eq!(derived.attribute_as::<String>("route").map(String::as_str), Some("home"));
        assert_eq!(derived.attribute_or("missing", 7_u8), 7);
        assert_eq!(derived.attribute_or("route", 7_u8), 7);
        assert!(request.attribute("route").is_none());

        let removed = derived.without_attribute("route");
        assert!(removed.attributes().is_empty());
        assert_eq!(derived.attributes().len(), 1);

        let unchanged = removed.without_attribute("route");
        assert!(unchanged.attributes().is_empty());
    }

    #[test]
    fn test_with_params() {
        let request = server_request();
        let derived = request
            .with_cookie_params(&raw(RawValue::map([("session", "abc")]))).unwrap()
            .with_query_params(&raw(RawValue::map([("page", "2")]))).unwrap()
            .with_parsed_body(&RawValue::map([("name", "value")])).unwrap();

        assert_eq!(derived.cookie_params()["session"].as_str(), Some("abc"));
        assert_eq!(derived.query_params()["page"].as_str(), Some("2"));
        assert_eq!(derived.parsed_body().as_form().unwrap()["name"], "value");

        assert!(request.cookie_params().is_empty());
        assert!(request.parsed_body().is_none());

        assert!(matches!(
            request.with_query_params(&raw(RawValue::map([("page", RawValue::Int(2))]))),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(request.with_parsed_body(&RawValue::Bool(true)), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_with_uploaded_files() {
        let file = create_uploaded_file(SharedStream::new(Stream::from_string("x")), None, 0, None, None).unwrap();
        let request = server_request()
            .with_uploaded_files(&raw(RawValue::map([("file", RawValue::list([file]))])))
            .unwrap();
        assert_eq!(request.uploaded_files()["file"].len(), 1);
    }

    #[test]
    fn test_message_operations_keep_server_data() {
        let request = server_request()
            .with_query_params(&raw(RawValue::map([("q", "rust")]))).unwrap();
        let derived = request.with_header("X-Trace", "1").with_method("POST").unwrap();

        assert_eq!(derived.query_params()["q"].as_str(), Some("rust"));
        assert_eq!(derived.method(), Method::Post);
        assert!(!request.has_header("x-trace"));
    }
}
