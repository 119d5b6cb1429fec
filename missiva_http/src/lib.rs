// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Immutable HTTP message values: requests, responses, URIs, streams and
//! uploaded files. Every `with_*` operation returns a new value and leaves
//! the original untouched.

pub mod error;
pub mod header_store;
pub mod message;
pub mod method;
pub mod request;
pub mod response;
pub mod status;
pub mod stream;
pub mod uploaded_file;
pub mod uri;

pub use error::*;
pub use header_store::*;
pub use message::*;
pub use method::*;
pub use request::*;
pub use response::*;
pub use status::*;
pub use stream::*;
pub use uploaded_file::*;
pub use uri::*;
