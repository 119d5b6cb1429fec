// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{fmt, io::Read};

use strum_macros::AsRefStr;

use crate::{
    raw_value::{RawMap, RawValue},
    server_headers::HeaderSource,
};

/// How the current process was invoked.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, AsRefStr)]
pub enum ExecutionContext {
    /// Invoked by a web server for a request.
    #[default]
    Web,

    /// Started from a command line.
    CommandLine,

    /// Invoked through the (Fast)CGI gateway.
    Cgi,
}

impl ExecutionContext {
    /// Maps the server API name the runtime reports (`cli`, `cgi-fcgi`,
    /// `fpm-fcgi`, `apache2handler`, ...) to a context.
    #[must_use]
    pub fn from_sapi_name(name: &str) -> Self {
        match name {
            "cli" => Self::CommandLine,
            "cgi-fcgi" => Self::Cgi,
            _ => Self::Web,
        }
    }

    /// Only requests from a web context carry cookies, query and body data.
    #[must_use]
    pub const fn is_web(&self) -> bool {
        matches!(self, Self::Web)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ServerRequestSettings {
    /// The host names `SERVER_NAME` may have. Any other host is rejected,
    /// so an empty list rejects every request.
    pub allowed_hosts: Vec<String>,

    pub execution_context: ExecutionContext,
}

impl ServerRequestSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
            where I: IntoIterator<Item = S>, S: Into<String> {
        self.allowed_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_execution_context(mut self, execution_context: ExecutionContext) -> Self {
        self.execution_context = execution_context;
        self
    }

    #[must_use]
    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.iter().any(|allowed| allowed == host)
    }
}

/// Everything the web server hands over for one request.
pub struct ServerEnvironment {
    /// The server variables, e.g. `REQUEST_METHOD`, `SERVER_NAME`.
    pub server: RawMap,
    pub cookies: RawMap,
    pub query: RawMap,

    /// Decoded form data, a deserialized object, or null.
    pub body: RawValue,

    /// The upload descriptor groups by form field.
    pub files: RawMap,

    /// The raw request body.
    pub input: Option<Box<dyn Read + Send>>,

    /// The request headers as the web server reports them. When absent, the
    /// headers are derived from the `HTTP_*` server variables.
    pub header_source: Option<Box<dyn HeaderSource>>,
}

impl ServerEnvironment {
    #[must_use]
    pub fn new(server: RawMap) -> Self {
        Self {
            server,
            cookies: RawMap::new(),
            query: RawMap::new(),
            body: RawValue::Null,
            files: RawMap::new(),
            input: None,
            header_source: None,
        }
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: RawMap) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: RawMap) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RawValue) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: RawMap) -> Self {
        self.files = files;
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: impl Read + Send + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    #[must_use]
    pub fn with_header_source(mut self, source: impl HeaderSource + 'static) -> Self {
        self.header_source = Some(Box::new(source));
        self
    }
}

impl fmt::Debug for ServerEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEnvironment")
            .field("server", &self.server)
            .field("cookies", &self.cookies)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("files", &self.files)
            .field("input", &self.input.is_some())
            .field("header_source", &self.header_source.is_some())
            .finish()
    }
}
