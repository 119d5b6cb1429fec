// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Turns upload data into uploaded files grouped by form field.
//!
//! The web server describes the uploads of one field as a group of
//! parallel columns:
//! ```text
//! avatar => {
//!     name:      ["a.png", "b.png"],
//!     full_path: ["a.png", "b.png"],
//!     type:      ["image/png", "image/png"],
//!     tmp_name:  ["/tmp/phpA", "/tmp/phpB"],
//!     error:     [0, 0],
//!     size:      [1024, 2048],
//! }
//! ```
//! A single upload may use plain values instead of one-element lists.

use indexmap::IndexMap;
use missiva_http::{create_uploaded_file, Error, Result, SharedStream, Stream, UploadedFile};
use tracing::trace;

use crate::raw_value::{RawKey, RawMap, RawValue};

/// Uploaded files by form field name.
pub type UploadedFiles = IndexMap<String, Vec<UploadedFile>>;

const DESCRIPTOR_KEYS: [&str; 6] = ["name", "full_path", "type", "tmp_name", "error", "size"];

fn field_name(key: &RawKey) -> Result<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::type_mismatch(format!("upload field name `{key}` is not a string")))
}

/// Accepts an already built tree: every field maps to a list of
/// [`UploadedFile`]s.
pub fn parse_uploaded_files(uploaded_files: &RawMap) -> Result<UploadedFiles> {
    let mut result = UploadedFiles::new();

    for (key, files) in uploaded_files {
        let name = field_name(key)?;
        let items: Vec<&RawValue> = match files {
            RawValue::List(items) => items.iter().collect(),
            RawValue::Map(items) => items.values().collect(),
            other => return Err(Error::type_mismatch(format!(
                "uploaded files of field `{name}` must be a list, got {}", other.type_name()
            ))),
        };

        let entry = result.entry(name).or_default();
        for item in items {
            match item {
                RawValue::File(file) => entry.push(file.clone()),
                other => return Err(Error::type_mismatch(format!(
                    "expected an uploaded file, got {}", other.type_name()
                ))),
            }
        }
    }

    Ok(result)
}

/// Builds uploaded files from the per-field descriptor groups the web
/// server provides. Each file's contents are opened read-only from its
/// temporary location.
pub fn parse_uploaded_file_descriptors(descriptors: &RawMap) -> Result<UploadedFiles> {
    let mut result = UploadedFiles::new();

    for (key, data) in descriptors {
        let name = field_name(key)?;
        let RawValue::Map(data) = data else {
            return Err(Error::type_mismatch(format!(
                "upload descriptor of field `{name}` must be a map, got {}", data.type_name()
            )));
        };

        let descriptor = Descriptor::parse(data)?;
        let count = descriptor.count();

        let mut files = Vec::with_capacity(count);
        for index in 0..count {
            files.push(descriptor.file(index)?);
        }

        trace!("parsed {count} uploaded file(s) for field {name}");
        result.insert(name, files);
    }

    Ok(result)
}

/// The columns of one descriptor group, keyed by file index.
struct Descriptor {
    columns: IndexMap<&'static str, RawMap>,
}

impl Descriptor {
    fn parse(data: &RawMap) -> Result<Self> {
        let mut columns = IndexMap::new();

        for key in DESCRIPTOR_KEYS {
            let Some(value) = data.get(&RawKey::from(key)) else {
                return Err(Error::not_found(format!("upload descriptor key `{key}` is missing")));
            };

            let column = match value {
                RawValue::List(items) => items.iter()
                    .enumerate()
                    .map(|(index, item)| (RawKey::Int(index as i64), item.clone()))
                    .collect(),
                RawValue::Map(items) => items.clone(),
                scalar => RawMap::from([(RawKey::Int(0), scalar.clone())]),
            };
            columns.insert(key, column);
        }

        Ok(Self { columns })
    }

    fn count(&self) -> usize {
        self.columns.get("name").map_or(0, IndexMap::len)
    }

    fn value(&self, key: &str, index: usize) -> Result<&RawValue> {
        let value = self.columns.get(key)
            .ok_or_else(|| Error::not_found(format!("upload descriptor key `{key}` is missing")))?
            .get(&RawKey::Int(index as i64))
            .ok_or_else(|| Error::not_found(format!("upload descriptor `{key}` has no index {index}")))?;

        match value {
            RawValue::Int(_) | RawValue::String(_) | RawValue::Null => Ok(value),
            other => Err(Error::type_mismatch(format!(
                "upload descriptor `{key}` has a value of type {}", other.type_name()
            ))),
        }
    }

    fn string(&self, key: &str, index: usize) -> Result<String> {
        match self.value(key, index)? {
            RawValue::String(value) => Ok(value.clone()),
            other => Err(Error::type_mismatch(format!(
                "upload descriptor `{key}` must be a string, got {}", other.type_name()
            ))),
        }
    }

    fn nullable_string(&self, key: &str, index: usize) -> Result<Option<String>> {
        match self.value(key, index)? {
            RawValue::Null => Ok(None),
            _ => self.string(key, index).map(Some),
        }
    }

    fn int(&self, key: &str, index: usize) -> Result<i64> {
        match self.value(key, index)? {
            RawValue::Int(value) => Ok(*value),
            other => Err(Error::type_mismatch(format!(
                "upload descriptor `{key}` must be an integer, got {}", other.type_name()
            ))),
        }
    }

    fn file(&self, index: usize) -> Result<UploadedFile> {
        let tmp_name = self.string("tmp_name", index)?;
        let size = self.int("size", index)?;
        let size = u64::try_from(size)
            .map_err(|_| Error::type_mismatch(format!("upload size {size} is negative")))?;
        let error = self.int("error", index)?;
        let client_filename = self.nullable_string("name", index)?;
        let client_media_type = self.nullable_string("type", index)?;

        let stream = SharedStream::new(Stream::open(&tmp_name, "r")?);
        create_uploaded_file(stream, Some(size), error, client_filename, client_media_type)
    }
}
