// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Untyped input as handed over by the web server: server variables,
//! cookies, query and body parameters and upload descriptors. Nothing in
//! here is trusted; the parsers turn it into typed values or fail.

use std::{any::Any, fmt, sync::Arc};

use indexmap::IndexMap;
use missiva_http::UploadedFile;

/// Keys of a [`RawValue::Map`]. Keys that look like integers arrive as
/// integers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RawKey {
    Int(i64),
    String(String),
}

impl RawKey {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(key) => Some(key),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(key) => write!(f, "{key}"),
            Self::String(key) => f.write_str(key),
        }
    }
}

impl From<&str> for RawKey {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RawKey {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for RawKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

pub type RawMap = IndexMap<RawKey, RawValue>;

#[derive(Clone)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<RawValue>),
    Map(RawMap),

    /// An opaque object, e.g. a deserialized request body.
    Object(Arc<dyn Any + Send + Sync>),

    /// An already constructed uploaded file.
    File(UploadedFile),
}

impl RawValue {
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
            where K: Into<RawKey>, V: Into<RawValue> {
        Self::Map(entries.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }

    pub fn list<V: Into<RawValue>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn object<T: Any + Send + Sync>(object: T) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Whether this is a single boolean, number or string.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// The string form of a scalar. Booleans convert to `"1"` and `""`.
    #[must_use]
    pub fn scalar_to_string(&self) -> Option<String> {
        Some(match self {
            Self::Bool(true) => String::from("1"),
            Self::Bool(false) => String::new(),
            Self::Int(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::String(value) => value.clone(),
            _ => return None,
        })
    }

    /// Name of the kind of value, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::File(_) => "uploaded file",
        }
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::File(file) => f.debug_tuple("File").field(&file.client_filename()).finish(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<UploadedFile> for RawValue {
    fn from(value: UploadedFile) -> Self {
        Self::File(value)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(value: Vec<RawValue>) -> Self {
        Self::List(value)
    }
}

impl From<RawMap> for RawValue {
    fn from(value: RawMap) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
