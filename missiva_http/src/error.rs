// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io;

use strum_macros::AsRefStr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the message values and the server-request pipeline can
/// report. Nothing in this workspace substitutes a default for invalid
/// input, so callers either get a fully valid value or one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value was well-formed but not in the allowed set, e.g. an unknown
    /// method or a host outside the allow-list.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A value from an untyped source did not have the expected shape.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A required key or index was absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stream or file operation failed.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The invoking environment cannot satisfy a precondition.
    #[error("logic error: {0}")]
    Logic(String),
}

impl Error {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn logic(message: impl Into<String>) -> Self {
        Self::Logic(message.into())
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Resource(ResourceError::Io { action: "perform I/O", source: error })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, AsRefStr, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid method `{0}`")]
    InvalidMethod(String),

    #[error("invalid status code {0}")]
    InvalidStatusCode(u16),

    /// The upload error code is not one of the standard codes.
    #[error("invalid upload error code {0}")]
    InvalidUploadErrorCode(i64),

    /// `SERVER_NAME` is not in the configured allow-list.
    #[error("host `{0}` is not in the allowed hosts list")]
    HostNotAllowed(String),

    /// `SERVER_PROTOCOL` is not `HTTP/1.1` or `HTTP/2.0`.
    #[error("unsupported server protocol `{0}`")]
    UnsupportedServerProtocol(String),
}

#[derive(Debug, AsRefStr, thiserror::Error)]
pub enum ResourceError {
    /// The stream was detached or closed, there is no handle left.
    #[error("stream has no underlying resource")]
    Detached,

    #[error("stream is not readable")]
    NotReadable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("stream is not seekable")]
    NotSeekable,

    /// The size of a stream could not be determined.
    #[error("stream size is unknown")]
    UnknownSize,

    /// The uploaded file was already moved to another location.
    #[error("uploaded file was already moved")]
    AlreadyMoved,

    /// The upload itself failed, the message is the standard description of
    /// the error code.
    #[error("{0}")]
    UploadFailed(&'static str),

    /// The directory the uploaded file should be moved into is unusable.
    #[error("target directory `{0}` is not writable")]
    TargetNotWritable(String),

    #[error("failed to {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ResourceError {
    pub(crate) fn io(action: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Resource(ResourceError::Io { action, source })
    }
}
