// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Ordering of the media types listed in an `Accept` header.
//!
//! Every entry gets a key `"{quality}.{index}"`, where the index counts down
//! from the number of entries so that earlier entries of equal quality sort
//! first. Entries with quality `0` are not acceptable and are dropped.

use std::cmp::Ordering;

use missiva_http::{HttpMessage, Result};
use tracing::trace;

const DEFAULT_QUALITY: &str = "1";
const QUALITY_SEPARATOR: &str = ";q=";

/// An entry of a processed `Accept` list.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptEntry {
    /// `"{quality}.{index}"`.
    pub key: String,
    pub media_type: String,
    pub quality: f64,
    pub index: usize,
}

/// Returns the first `Accept` header value of `request`.
pub fn accept_header_value<M: HttpMessage>(request: &M) -> Result<&str> {
    request.required_header_value("Accept")
}

/// Orders the media types of an `Accept` header value by descending
/// preference. Spaces are removed and the value is lowercased first.
#[must_use]
pub fn process_accept_list(value: &str) -> Vec<AcceptEntry> {
    let value: String = value.chars()
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_lowercase();

    let parts: Vec<&str> = value.split(',').collect();
    let mut index = parts.len();
    let mut entries = Vec::with_capacity(parts.len());

    for part in parts {
        let (media_type, quality) = split_quality(part);
        if quality == "0" {
            trace!("dropping unacceptable media type {media_type}");
            continue;
        }

        entries.push(AcceptEntry {
            key: format!("{quality}.{index}"),
            media_type: media_type.to_string(),
            quality: quality.parse().unwrap_or(0.0),
            index,
        });
        index -= 1;
    }

    entries.sort_by(|a, b| {
        b.quality.partial_cmp(&a.quality)
            .unwrap_or(Ordering::Equal)
            .then(b.index.cmp(&a.index))
    });
    entries
}

fn split_quality(part: &str) -> (&str, &str) {
    let mut pieces = part.split(QUALITY_SEPARATOR);
    let media_type = pieces.next().unwrap_or_default();
    match pieces.next() {
        Some(quality) => (media_type, quality),
        None => (media_type, DEFAULT_QUALITY),
    }
}
