// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The URI value used by requests.
//!
//! Decomposition follows the generic syntax of
//! [RFC 3986 Appendix B](https://www.rfc-editor.org/rfc/rfc3986.html#appendix-B):
//! ```text
//! ^(([^:/?#]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?
//! ```
//! The components are kept as written (no percent-decoding, no path
//! normalization), only the scheme and host are lowercased when parsing.

use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{Error, Result};

lazy_static! {
    static ref URI_REFERENCE: Regex = Regex::new(
        r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$"
    ).expect("URI reference pattern is valid");
}

/// The components of a URL as returned by the syntax decomposer, before any
/// normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct UrlComponents<'a> {
    scheme: Option<&'a str>,
    user: Option<&'a str>,
    password: Option<&'a str>,
    host: Option<&'a str>,
    port: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn decompose(input: &str) -> Option<UrlComponents<'_>> {
    let captures = URI_REFERENCE.captures(input)?;

    let mut components = UrlComponents {
        scheme: captures.get(1).map(|m| m.as_str()),
        path: captures.get(3).map_or("", |m| m.as_str()),
        query: captures.get(4).map(|m| m.as_str()),
        fragment: captures.get(5).map(|m| m.as_str()),
        ..Default::default()
    };

    if let Some(authority) = captures.get(2).map(|m| m.as_str()) {
        let host_and_port = match authority.rsplit_once('@') {
            Some((user_info, rest)) => {
                match user_info.split_once(':') {
                    Some((user, password)) => {
                        components.user = Some(user);
                        components.password = Some(password);
                    }
                    None => components.user = Some(user_info),
                }
                rest
            }
            None => authority,
        };

        // An IP-literal contains colons itself, the port can only follow the
        // closing bracket.
        let port_separator = match host_and_port.rfind(']') {
            Some(bracket) => host_and_port[bracket..].find(':').map(|index| bracket + index),
            None => {
                let mut colons = host_and_port.match_indices(':').map(|(index, _)| index);
                let separator = colons.next();
                if colons.next().is_some() {
                    return None;
                }
                separator
            }
        };

        match port_separator {
            Some(index) => {
                components.host = Some(&host_and_port[..index]);
                let port = &host_and_port[index + 1..];
                if !port.is_empty() {
                    components.port = Some(port);
                }
            }
            None => components.host = Some(host_and_port),
        }
    }

    Some(components)
}

fn parse_port(port: Option<&str>) -> Result<Option<u16>> {
    let Some(port) = port else {
        return Ok(None);
    };

    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::type_mismatch(format!("port `{port}` is not an integer")));
    }

    port.parse()
        .map(Some)
        .map_err(|_| Error::type_mismatch(format!("port `{port}` is out of range")))
}

/// An immutable URI. Every `with_*` method returns a new value and leaves
/// `self` untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: String,
    user: String,
    password: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

impl Uri {
    /// Decomposes `url` into its components.
    ///
    /// The scheme and host are lowercased, as required by
    /// [RFC 3986 Section 3.1](https://www.rfc-editor.org/rfc/rfc3986.html#section-3.1)
    /// and [Section 3.2.2](https://www.rfc-editor.org/rfc/rfc3986.html#section-3.2.2).
    pub fn parse(url: &str) -> Result<Self> {
        let components = decompose(url)
            .ok_or_else(|| Error::type_mismatch(format!("unable to parse url `{url}`")))?;

        Ok(Self {
            scheme: components.scheme.unwrap_or_default().to_ascii_lowercase(),
            user: components.user.unwrap_or_default().to_string(),
            password: components.password.map(str::to_string),
            host: components.host.unwrap_or_default().to_ascii_lowercase(),
            port: parse_port(components.port)?,
            path: components.path.to_string(),
            query: components.query.unwrap_or_default().to_string(),
            fragment: components.fragment.unwrap_or_default().to_string(),
        })
    }

    /// `[user-info@]host[:port]`, with absent parts omitted.
    #[must_use]
    pub fn authority(&self) -> String {
        let mut authority = String::new();

        let user_info = self.user_info();
        if !user_info.is_empty() {
            authority.push_str(&user_info);
            authority.push('@');
        }

        authority.push_str(&self.host);

        if let Some(port) = self.port {
            authority.push(':');
            authority.push_str(&port.to_string());
        }

        authority
    }

    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `user[:password]`.
    #[must_use]
    pub fn user_info(&self) -> String {
        match &self.password {
            Some(password) => format!("{}:{password}", self.user),
            None => self.user.clone(),
        }
    }

    #[must_use]
    pub fn with_fragment(&self, fragment: &str) -> Self {
        if fragment == self.fragment {
            return self.clone();
        }
        Self { fragment: fragment.to_string(), ..self.clone() }
    }

    /// Replaces the host. Unlike [`Uri::parse`], the value is stored as
    /// given and is not lowercased.
    #[must_use]
    pub fn with_host(&self, host: &str) -> Self {
        if host == self.host {
            return self.clone();
        }
        Self { host: host.to_string(), ..self.clone() }
    }

    #[must_use]
    pub fn with_port(&self, port: Option<u16>) -> Self {
        if port == self.port {
            return self.clone();
        }
        Self { port, ..self.clone() }
    }

    #[must_use]
    pub fn with_path(&self, path: &str) -> Self {
        if path == self.path {
            return self.clone();
        }
        Self { path: path.to_string(), ..self.clone() }
    }

    #[must_use]
    pub fn with_query(&self, query: &str) -> Self {
        if query == self.query {
            return self.clone();
        }
        Self { query: query.to_string(), ..self.clone() }
    }

    /// Replaces the scheme. Unlike [`Uri::parse`], the value is stored as
    /// given and is not lowercased.
    #[must_use]
    pub fn with_scheme(&self, scheme: &str) -> Self {
        if scheme == self.scheme {
            return self.clone();
        }
        Self { scheme: scheme.to_string(), ..self.clone() }
    }

    #[must_use]
    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Self {
        if user == self.user && password == self.password.as_deref() {
            return self.clone();
        }
        Self {
            user: user.to_string(),
            password: password.map(str::to_string),
            ..self.clone()
        }
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }

        let authority = self.authority();
        if !authority.is_empty() {
            write!(f, "//{authority}")?;
        }

        f.write_str(&self.path)?;

        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }

        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }

        Ok(())
    }
}
