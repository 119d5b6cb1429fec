// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt;

use phf::phf_map;

use crate::{Result, ValidationError};

/// The request methods a message can carry. Anything else is rejected at
/// construction, there is no catch-all variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Purge,
    Put,
    Trace,
}

impl Method {
    /// Get the method in string form.
    ///
    /// # Notes
    /// Methods are case-sensitive, as per
    /// [RFC 9110 - Section 9.1](https://www.rfc-editor.org/rfc/rfc9110.html#section-9.1-5):
    /// > The method token is case-sensitive because it might be used as a
    /// > gateway to object-based systems with case-sensitive method names. By
    /// > convention, standardized methods are defined in all-uppercase US-ASCII
    /// > letters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Purge => "PURGE",
            Self::Put => "PUT",
            Self::Trace => "TRACE",
        }
    }

    /// Only these methods get a raw request body attached when a server
    /// request is built from the environment.
    #[must_use]
    pub const fn can_have_request_body(&self) -> bool {
        matches!(self, Self::Patch | Self::Post | Self::Put)
    }

    /// Returns every allowed method, in alphabetical order.
    pub fn all() -> impl Iterator<Item = Method> {
        [
            Self::Connect, Self::Delete, Self::Get, Self::Head, Self::Options,
            Self::Patch, Self::Post, Self::Purge, Self::Put, Self::Trace,
        ].into_iter()
    }
}

static METHOD_MAP: phf::Map<&'static str, Method> = phf_map!(
    "CONNECT" => Method::Connect,
    "DELETE" => Method::Delete,
    "GET" => Method::Get,
    "HEAD" => Method::Head,
    "OPTIONS" => Method::Options,
    "PATCH" => Method::Patch,
    "POST" => Method::Post,
    "PURGE" => Method::Purge,
    "PUT" => Method::Put,
    "TRACE" => Method::Trace,
);

/// Validates the method against the allowed set. A returned `Ok` is the
/// success signal; an unknown method is always an error, never `false`.
pub fn validate_method(method: &str) -> Result<Method> {
    match METHOD_MAP.get(method) {
        Some(method) => Ok(*method),
        None => Err(ValidationError::InvalidMethod(method.to_string()).into()),
    }
}

impl TryFrom<&str> for Method {
    type Error = crate::Error;

    fn try_from(value: &str) -> Result<Self> {
        validate_method(value)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
