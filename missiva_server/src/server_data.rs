// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{any::Any, fmt, sync::Arc};

use indexmap::IndexMap;
use missiva_http::{Error, Result};
use tracing::trace;

use crate::raw_value::{RawKey, RawMap, RawValue};

/// A cookie or query parameter. Bracketed keys like `filter[post]=1`
/// produce nested parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Param {
    Value(String),
    Nested(Params),
}

impl Param {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Nested(_) => None,
        }
    }

    #[must_use]
    pub fn as_nested(&self) -> Option<&Params> {
        match self {
            Self::Value(_) => None,
            Self::Nested(params) => Some(params),
        }
    }
}

pub type Params = IndexMap<String, Param>;

/// A value in the server parameters: a scalar, `null`, or a list of strings
/// (as used for `argv`).
#[derive(Clone, Debug, PartialEq)]
pub enum ServerParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
}

impl ServerParam {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

pub type ServerParams = IndexMap<String, ServerParam>;

/// The parsed body of a request.
#[derive(Clone, Default)]
pub enum ParsedBody {
    #[default]
    None,

    /// Form fields.
    Form(IndexMap<String, String>),

    /// An object produced by a body deserializer, passed through untouched.
    Object(Arc<dyn Any + Send + Sync>),
}

impl ParsedBody {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn as_form(&self) -> Option<&IndexMap<String, String>> {
        match self {
            Self::Form(form) => Some(form),
            _ => None,
        }
    }

    #[must_use]
    pub fn downcast_object<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(object) => object.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for ParsedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Form(form) => f.debug_tuple("Form").field(form).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

/// Parses cookie or query parameters. Nested maps and lists are followed,
/// every leaf must be a string. Integer keys are kept in their decimal
/// form.
pub fn parse_cookie_query_params(params: &RawMap) -> Result<Params> {
    params.iter()
        .map(|(key, value)| Ok((key.to_string(), parse_param(key, value)?)))
        .collect()
}

fn parse_param(key: &RawKey, value: &RawValue) -> Result<Param> {
    match value {
        RawValue::String(value) => Ok(Param::Value(value.clone())),
        RawValue::Map(nested) => parse_cookie_query_params(nested).map(Param::Nested),
        RawValue::List(items) => items.iter()
            .enumerate()
            .map(|(index, item)| {
                let index = RawKey::Int(index as i64);
                Ok((index.to_string(), parse_param(&index, item)?))
            })
            .collect::<Result<Params>>()
            .map(Param::Nested),
        other => Err(Error::type_mismatch(format!(
            "parameter `{key}` must be a string, got {}", other.type_name()
        ))),
    }
}

/// Parses the request body data: form fields (string keys and values), an
/// opaque object, or nothing.
pub fn parse_body_data(data: &RawValue) -> Result<ParsedBody> {
    match data {
        RawValue::Null => Ok(ParsedBody::None),
        RawValue::Object(object) => Ok(ParsedBody::Object(Arc::clone(object))),
        RawValue::Map(fields) => fields.iter()
            .map(|(key, value)| {
                let Some(key) = key.as_str() else {
                    return Err(Error::type_mismatch(format!("body field name `{key}` is not a string")));
                };
                let Some(value) = value.as_str() else {
                    return Err(Error::type_mismatch(format!(
                        "body field `{key}` must be a string, got {}", value.type_name()
                    )));
                };
                Ok((key.to_string(), value.to_string()))
            })
            .collect::<Result<IndexMap<String, String>>>()
            .map(ParsedBody::Form),
        RawValue::List(items) if items.is_empty() => Ok(ParsedBody::Form(IndexMap::new())),
        other => Err(Error::type_mismatch(format!("invalid body data of type {}", other.type_name()))),
    }
}

/// Parses the server variables. Keys must be strings; values must be
/// scalars, `null` or lists of strings.
pub fn parse_server_params(params: &RawMap) -> Result<ServerParams> {
    params.iter()
        .map(|(key, value)| {
            let Some(key) = key.as_str() else {
                return Err(Error::type_mismatch(format!("server parameter key `{key}` is not a string")));
            };
            Ok((key.to_string(), parse_server_value(key, value)?))
        })
        .collect()
}

fn parse_server_value(key: &str, value: &RawValue) -> Result<ServerParam> {
    Ok(match value {
        RawValue::Null => ServerParam::Null,
        RawValue::Bool(value) => ServerParam::Bool(*value),
        RawValue::Int(value) => ServerParam::Int(*value),
        RawValue::Float(value) => ServerParam::Float(*value),
        RawValue::String(value) => ServerParam::String(value.clone()),
        RawValue::List(items) => ServerParam::List(string_items(key, items.iter())?),
        RawValue::Map(items) => {
            trace!("server parameter {key} is a map, keeping its values only");
            ServerParam::List(string_items(key, items.values())?)
        }
        other => return Err(Error::type_mismatch(format!(
            "server parameter `{key}` has unsupported type {}", other.type_name()
        ))),
    })
}

fn string_items<'a>(key: &str, items: impl Iterator<Item = &'a RawValue>) -> Result<Vec<String>> {
    items.map(|item| match item {
        RawValue::String(item) => Ok(item.clone()),
        other => Err(Error::type_mismatch(format!(
            "server parameter `{key}` contains a non-string item of type {}", other.type_name()
        ))),
    }).collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn raw_map(value: RawValue) -> RawMap {
        match value {
            RawValue::Map(map) => map,
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_query_params() {
        let query = raw_map(RawValue::map([
            ("page", RawValue::from("2")),
            ("filter", RawValue::map([("post", "1,2"), ("author", "12")])),
            ("tags", RawValue::list(["a", "b"])),
        ]));

        let params = parse_cookie_query_params(&query).unwrap();
        assert_eq!(params["page"].as_str(), Some("2"));

        let filter = params["filter"].as_nested().unwrap();
        assert_eq!(filter["post"].as_str(), Some("1,2"));
        assert_eq!(filter["author"].as_str(), Some("12"));

        let tags = params["tags"].as_nested().unwrap();
        assert_eq!(tags["0"].as_str(), Some("a"));
        assert_eq!(tags["1"].as_str(), Some("b"));
    }

    #[test]
    fn test_integer_keys_are_stringified() {
        let query = raw_map(RawValue::map([(RawKey::Int(5), "five")]));
        let params = parse_cookie_query_params(&query).unwrap();
        assert_eq!(params["5"].as_str(), Some("five"));
    }

    #[rstest]
    #[case(RawValue::Int(1))]
    #[case(RawValue::Null)]
    #[case(RawValue::Bool(true))]
    #[case(RawValue::map([("deep", RawValue::Float(1.0))]))]
    fn test_non_string_leaf(#[case] value: RawValue) {
        let query = raw_map(RawValue::map([("key", value)]));
        assert!(matches!(parse_cookie_query_params(&query), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_body_data() {
        assert!(parse_body_data(&RawValue::Null).unwrap().is_none());

        let form = parse_body_data(&RawValue::map([("name", "value")])).unwrap();
        assert_eq!(form.as_form().unwrap()["name"], "value");

        let object = parse_body_data(&RawValue::object(42_u32)).unwrap();
        assert_eq!(object.downcast_object::<u32>(), Some(&42));
    }

    #[rstest]
    #[case(RawValue::from("raw"))]
    #[case(RawValue::Int(3))]
    #[case(RawValue::map([(RawKey::Int(0), "value")]))]
    #[case(RawValue::map([("field", RawValue::list(["a"]))]))]
    fn test_invalid_body_data(#[case] data: RawValue) {
        assert!(matches!(parse_body_data(&data), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_server_params() {
        let server = raw_map(RawValue::map([
            ("REQUEST_METHOD", RawValue::from("GET")),
            ("REQUEST_TIME", RawValue::Int(1_700_000_000)),
            ("REQUEST_TIME_FLOAT", RawValue::Float(1_700_000_000.5)),
            ("argv", RawValue::list(["index.php", "--flag"])),
            ("PHP_AUTH_USER", RawValue::Null),
        ]));

        let params = parse_server_params(&server).unwrap();
        assert_eq!(params["REQUEST_METHOD"].as_str(), Some("GET"));
        assert_eq!(params["REQUEST_TIME"], ServerParam::Int(1_700_000_000));
        assert_eq!(params["argv"], ServerParam::List(vec![
            String::from("index.php"), String::from("--flag"),
        ]));
        assert_eq!(params["PHP_AUTH_USER"], ServerParam::Null);
        assert_eq!(params.get_index(0).map(|(key, _)| key.as_str()), Some("REQUEST_METHOD"));
    }

    #[rstest]
    #[case(RawValue::map([(RawKey::Int(0), "value")]))]
    #[case(RawValue::map([("argv", RawValue::list([RawValue::Int(1)]))]))]
    #[case(RawValue::map([("body", RawValue::object(()))]))]
    fn test_invalid_server_params(#[case] server: RawValue) {
        assert!(matches!(parse_server_params(&raw_map(server)), Err(Error::TypeMismatch(_))));
    }
}
