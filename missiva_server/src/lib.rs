// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Construction of validated, immutable server requests from the untyped
//! data a web server provides: server variables, cookies, query and body
//! parameters, upload descriptors and the raw request input.

pub mod accept;
pub mod config;
pub mod content_type;
pub mod factory;
pub mod raw_value;
pub mod server_data;
pub mod server_headers;
pub mod server_params;
pub mod server_request;
pub mod uploaded_file_parser;

pub use accept::*;
pub use config::*;
pub use content_type::*;
pub use factory::*;
pub use raw_value::*;
pub use server_data::*;
pub use server_headers::*;
pub use server_params::*;
pub use server_request::*;
pub use uploaded_file_parser::*;
