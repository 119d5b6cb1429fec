// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use missiva_http::{Error, HttpMessage, HttpRequest, Result, SharedStream, Stream};
use tracing::debug;

use crate::{
    config::{ServerEnvironment, ServerRequestSettings},
    content_type::{is_form_content_type, resolve_content_type},
    server_params::ServerParamsProcessor,
    server_request::ServerRequest,
    uploaded_file_parser::parse_uploaded_file_descriptors,
};

/// Builds [`ServerRequest`]s from what the web server provides.
#[derive(Clone, Debug, Default)]
pub struct ServerRequestFactory {
    settings: ServerRequestSettings,
}

impl ServerRequestFactory {
    #[must_use]
    pub fn new(settings: ServerRequestSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ServerRequestSettings {
        &self.settings
    }

    /// Creates the server request for `environment`.
    ///
    /// The method and URI come from the server variables. Outside a web
    /// context the request is returned as is. Otherwise cookies, the parsed
    /// body, query parameters and uploads are attached, and for `PATCH`,
    /// `POST` and `PUT` requests that did not send form data the raw input
    /// becomes the body.
    pub fn create_server_request(&self, environment: ServerEnvironment) -> Result<ServerRequest> {
        let ServerEnvironment { server, cookies, query, body, files, input, header_source } = environment;

        let processor = ServerParamsProcessor::new(&server, &self.settings)?;
        let method = processor.process_method()?;
        let uri = processor.process_uri()?;
        debug!("resolved request {method} {uri}");

        let request = ServerRequest::new(method, uri, processor.into_params(), header_source.as_deref())?;

        if !self.settings.execution_context.is_web() {
            debug!("{} context, skipping request data", self.settings.execution_context.as_ref());
            return Ok(request);
        }

        let request = request
            .with_cookie_params(&cookies)?
            .with_parsed_body(&body)?
            .with_query_params(&query)?
            .with_uploaded_file_tree(parse_uploaded_file_descriptors(&files)?);

        if !request.method().can_have_request_body() {
            return Ok(request);
        }

        let content_type = resolve_content_type(request.server_params(), header_source.as_deref())?;
        if is_form_content_type(&content_type) {
            debug!("body of {content_type} request was already decoded");
            return Ok(request);
        }

        let Some(input) = input else {
            return Err(Error::logic("raw request input is not available"));
        };

        debug!("attaching raw input as body of {content_type} request");
        Ok(request.with_body(SharedStream::new(Stream::from_reader(input))))
    }
}
