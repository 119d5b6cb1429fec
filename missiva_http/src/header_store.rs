// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use hashbrown::HashMap;
use indexmap::IndexMap;

/// One or more values for a single header. Built from a single string or
/// from a sequence of strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderValues(Vec<String>);

impl HeaderValues {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for HeaderValues {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<&[&str]> for HeaderValues {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|value| value.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValues {
    fn from(values: [&str; N]) -> Self {
        Self(values.iter().map(|value| value.to_string()).collect())
    }
}

/// Header collection with case-insensitive lookup.
///
/// Values are stored under the name as it was given, in insertion order.
/// `index` maps the ASCII-lowercased name to that stored name; both maps
/// always hold the same set of headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderStore {
    headers: IndexMap<String, Vec<String>>,
    index: HashMap<String, String>,
}

fn lowercase(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl HeaderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already grouped headers. Names that only differ
    /// in case are merged into the first one seen.
    #[must_use]
    pub fn from_grouped(grouped: IndexMap<String, Vec<String>>) -> Self {
        let mut store = Self::new();
        for (name, values) in grouped {
            store.append(&name, HeaderValues(values));
        }
        store
    }

    /// Returns the name under which `name` is stored.
    #[must_use]
    pub fn original_name(&self, name: &str) -> Option<&str> {
        self.index.get(&lowercase(name)).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&lowercase(name))
    }

    /// Returns the values for `name`, or an empty slice when the header is
    /// absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &[String] {
        self.original_name(name)
            .and_then(|original| self.headers.get(original))
            .map_or(&[], Vec::as_slice)
    }

    /// The values for `name` joined by `", "`.
    #[must_use]
    pub fn line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.headers.iter()
    }

    #[must_use]
    pub fn as_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.headers
    }

    /// Replaces all values of `name`. The header is stored under exactly
    /// the given case, after the headers that are already present.
    pub fn set(&mut self, name: &str, values: impl Into<HeaderValues>) {
        self.remove(name);
        self.index.insert(lowercase(name), name.to_string());
        self.headers.insert(name.to_string(), values.into().0);
    }

    /// Appends values to `name`, keeping the stored case and position. Acts
    /// like [`HeaderStore::set`] when the header is absent.
    pub fn append(&mut self, name: &str, values: impl Into<HeaderValues>) {
        let Some(original) = self.original_name(name).map(str::to_string) else {
            self.set(name, values);
            return;
        };

        self.headers.entry(original)
            .or_default()
            .extend(values.into().0);
    }

    /// Returns whether the header was present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.index.remove(&lowercase(name)) {
            Some(original) => {
                self.headers.shift_remove(&original);
                true
            }
            None => false,
        }
    }
}
