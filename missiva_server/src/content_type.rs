// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use missiva_http::{Error, Result};
use unicase::UniCase;

use crate::{
    server_data::ServerParams,
    server_headers::HeaderSource,
};

const CONTENT_TYPE_HEADER: &str = "Content-Type";
const CONTENT_TYPE_VARIABLES: [&str; 2] = ["CONTENT_TYPE", "HTTP_CONTENT_TYPE"];

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Determines the content type of the request: `CONTENT_TYPE`, then
/// `HTTP_CONTENT_TYPE`, then the `Content-Type` entry of the header source.
pub fn resolve_content_type(
    server_params: &ServerParams,
    header_source: Option<&dyn HeaderSource>,
) -> Result<String> {
    for variable in CONTENT_TYPE_VARIABLES {
        if let Some(value) = server_params.get(variable).and_then(|value| value.as_str()) {
            return Ok(value.to_string());
        }
    }

    let entry = header_source.and_then(|source| {
        source.header_entries()
            .into_iter()
            .find(|(name, _)| name == CONTENT_TYPE_HEADER)
    });

    match entry {
        Some((_, value)) => value.scalar_to_string().ok_or_else(|| {
            Error::type_mismatch(format!("content type header is not a scalar, got {}", value.type_name()))
        }),
        None => Err(Error::logic("unable to determine the request content type")),
    }
}

/// The media type without parameters, e.g. `multipart/form-data` for
/// `multipart/form-data; boundary=x`.
#[must_use]
pub fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Whether the body of a request with this content type was already
/// decoded into form fields and uploaded files by the web server.
#[must_use]
pub fn is_form_content_type(content_type: &str) -> bool {
    let essence = UniCase::new(essence(content_type));
    essence == UniCase::new(FORM_URLENCODED) || essence == UniCase::new(MULTIPART_FORM_DATA)
}
