// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    header_store::{HeaderStore, HeaderValues},
    stream::SharedStream,
    Error,
    Result,
};

pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

/// The parts shared by every message: protocol version, headers and body.
///
/// The header store is reference counted and only copied when a derived
/// message actually changes it. The body is shared, not copied.
#[derive(Clone, Debug)]
pub struct Message {
    protocol_version: String,
    headers: Arc<HeaderStore>,
    body: SharedStream,
}

impl Message {
    #[must_use]
    pub fn new(body: SharedStream, headers: HeaderStore) -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            headers: Arc::new(headers),
            body,
        }
    }

    #[must_use]
    pub fn with_protocol(body: SharedStream, headers: HeaderStore, protocol_version: &str) -> Self {
        Self {
            protocol_version: protocol_version.to_string(),
            ..Self::new(body, headers)
        }
    }

    #[must_use]
    pub fn header_store(&self) -> &HeaderStore {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderStore {
        Arc::make_mut(&mut self.headers)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(SharedStream::default(), HeaderStore::new())
    }
}

/// Read access and copy-on-write derivation for anything that wraps a
/// [`Message`]. Derivations never touch `self`.
pub trait HttpMessage: Clone {
    fn message(&self) -> &Message;

    fn message_mut(&mut self) -> &mut Message;

    fn protocol_version(&self) -> &str {
        &self.message().protocol_version
    }

    /// All headers, keyed by the name as it was originally given.
    fn headers(&self) -> &IndexMap<String, Vec<String>> {
        self.message().headers.as_map()
    }

    fn has_header(&self, name: &str) -> bool {
        self.message().headers.contains(name)
    }

    fn header(&self, name: &str) -> &[String] {
        self.message().headers.get(name)
    }

    fn header_line(&self, name: &str) -> String {
        self.message().headers.line(name)
    }

    /// Returns the first value of a header that must be present.
    fn required_header_value(&self, name: &str) -> Result<&str> {
        self.header(name)
            .first()
            .map(String::as_str)
            .ok_or_else(|| Error::not_found(format!("header `{name}` is not present")))
    }

    fn body(&self) -> &SharedStream {
        &self.message().body
    }

    #[must_use]
    fn with_protocol_version(&self, version: &str) -> Self {
        let mut derived = self.clone();
        if version != self.protocol_version() {
            derived.message_mut().protocol_version = version.to_string();
        }
        derived
    }

    /// Replaces every value of `name`, case-insensitively. The new name
    /// casing wins.
    #[must_use]
    fn with_header(&self, name: &str, values: impl Into<HeaderValues>) -> Self {
        let mut derived = self.clone();
        derived.message_mut().headers_mut().set(name, values);
        derived
    }

    /// Appends to the values of `name`, keeping the casing it was first
    /// stored under.
    #[must_use]
    fn with_added_header(&self, name: &str, values: impl Into<HeaderValues>) -> Self {
        let mut derived = self.clone();
        derived.message_mut().headers_mut().append(name, values);
        derived
    }

    #[must_use]
    fn without_header(&self, name: &str) -> Self {
        let mut derived = self.clone();
        if self.has_header(name) {
            derived.message_mut().headers_mut().remove(name);
        }
        derived
    }

    #[must_use]
    fn with_body(&self, body: SharedStream) -> Self {
        let mut derived = self.clone();
        if !body.ptr_eq(self.body()) {
            derived.message_mut().body = body;
        }
        derived
    }
}

impl HttpMessage for Message {
    fn message(&self) -> &Message {
        self
    }

    fn message_mut(&mut self) -> &mut Message {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Stream;

    fn message() -> Message {
        let mut headers = HeaderStore::new();
        headers.set("Content-Type", "text/plain");
        Message::new(SharedStream::new(Stream::from_string("body")), headers)
    }

    #[test]
    fn test_defaults() {
        let message = Message::default();
        assert_eq!(message.protocol_version(), "1.1");
        assert!(message.headers().is_empty());
        assert_eq!(message.body().lock().size(), Some(0));
    }

    #[test]
    fn test_with_header_does_not_mutate_original() {
        let original = message();
        let derived = original.with_header("content-type", "application/json");

        assert_eq!(original.header("Content-Type"), ["text/plain"]);
        assert_eq!(derived.header("Content-Type"), ["application/json"]);
        assert_eq!(derived.headers().keys().collect::<Vec<_>>(), ["content-type"]);
    }

    #[test]
    fn test_with_added_header() {
        let original = message();
        let derived = original
            .with_added_header("CONTENT-TYPE", "charset=utf-8")
            .with_added_header("Accept", ["text/html", "*/*"]);

        assert_eq!(derived.header_line("content-type"), "text/plain, charset=utf-8");
        assert_eq!(derived.header_line("accept"), "text/html, */*");
        assert!(derived.headers().contains_key("Content-Type"));
        assert!(!original.has_header("Accept"));
    }

    #[test]
    fn test_without_header() {
        let original = message();
        let derived = original.without_header("CONTENT-TYPE");
        assert!(!derived.has_header("Content-Type"));
        assert!(original.has_header("Content-Type"));

        let unchanged = derived.without_header("X-Missing");
        assert!(unchanged.headers().is_empty());
    }

    #[test]
    fn test_with_body_shares_stream() {
        let original = message();
        let same = original.with_body(original.body().clone());
        assert!(same.body().ptr_eq(original.body()));

        let replaced = original.with_body(SharedStream::new(Stream::from_string("other")));
        assert!(!replaced.body().ptr_eq(original.body()));
        assert_eq!(original.body().lock().to_string_lossy(), "body");
        assert_eq!(replaced.body().lock().to_string_lossy(), "other");
    }

    #[test]
    fn test_with_protocol_version() {
        let original = message();
        let derived = original.with_protocol_version("2.0");
        assert_eq!(derived.protocol_version(), "2.0");
        assert_eq!(original.protocol_version(), "1.1");
    }

    #[test]
    fn test_required_header_value() {
        let message = message();
        assert_eq!(message.required_header_value("content-type").ok(), Some("text/plain"));
        assert!(matches!(message.required_header_value("Host"), Err(Error::NotFound(_))));
    }
}
