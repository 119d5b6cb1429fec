// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use crate::{
    header_store::HeaderStore,
    message::{HttpMessage, Message},
    status::{validate_status_code, StatusCode},
    stream::SharedStream,
    Result,
};

#[derive(Clone, Debug)]
pub struct Response {
    message: Message,
    status: StatusCode,
    reason_phrase: String,
}

fn resolve_reason_phrase(status: StatusCode, reason_phrase: &str) -> String {
    if reason_phrase.is_empty() {
        status.reason_phrase().to_string()
    } else {
        reason_phrase.to_string()
    }
}

impl Response {
    /// An empty reason phrase is replaced by the registered phrase of the
    /// status code.
    pub fn new(message: Message, code: u16, reason_phrase: &str) -> Result<Self> {
        let status = validate_status_code(code)?;
        Ok(Self {
            message,
            status,
            reason_phrase: resolve_reason_phrase(status, reason_phrase),
        })
    }

    /// Creates a `200 OK` response with an empty body and no headers.
    pub fn create() -> Self {
        Self {
            message: Message::new(SharedStream::default(), HeaderStore::new()),
            status: StatusCode::Ok,
            reason_phrase: StatusCode::Ok.reason_phrase().to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.reason_phrase
    }

    pub fn with_status(&self, code: u16, reason_phrase: &str) -> Result<Self> {
        let status = validate_status_code(code)?;
        Ok(Self {
            status,
            reason_phrase: resolve_reason_phrase(status, reason_phrase),
            ..self.clone()
        })
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{Error, ValidationError};

    #[test]
    fn test_create_defaults_to_ok() {
        let response = Response::create();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.reason_phrase(), "OK");
        assert_eq!(response.protocol_version(), "1.1");
    }

    #[rstest]
    #[case(404, "", "Not Found")]
    #[case(404, "Nope", "Nope")]
    #[case(503, "", "Service Unavailable")]
    fn test_with_status(#[case] code: u16, #[case] reason: &str, #[case] expected: &str) {
        let original = Response::create();
        let response = original.with_status(code, reason).unwrap();
        assert_eq!(response.status_code(), code);
        assert_eq!(response.reason_phrase(), expected);
        assert_eq!(original.status_code(), 200);
    }

    #[rstest]
    #[case(99)]
    #[case(306)]
    #[case(999)]
    fn test_invalid_status(#[case] code: u16) {
        assert!(matches!(
            Response::create().with_status(code, ""),
            Err(Error::Validation(ValidationError::InvalidStatusCode(_)))
        ));
        assert!(Response::new(Message::default(), code, "Custom").is_err());
    }

    #[test]
    fn test_headers_are_copy_on_write() {
        let response = Response::create();
        let derived = response.with_header("Content-Type", "text/html");
        assert!(derived.has_header("content-type"));
        assert!(!response.has_header("content-type"));
    }
}
