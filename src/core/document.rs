//! core::document
//!
//! The per-(language, namespace) translation document.
//!
//! # Format
//!
//! A document is a flat JSON object mapping key paths to strings:
//!
//! ```json
//! {
//!   "menu.open": "Open",
//!   "menu.quit": "Quit"
//! }
//! ```
//!
//! Keys are always held, and therefore always written, in canonical
//! (byte-wise lexicographic) order. Pretty output uses two-space
//! indentation and ends with a newline; compact output has neither.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::KeyPath;

/// Errors decoding a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("document root must be a JSON object")]
    NotAnObject,

    #[error("value of '{0}' is not a string")]
    NonStringValue(String),

    #[error("{0}")]
    InvalidKey(String),
}

/// How documents are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Two-space indentation, trailing newline.
    #[default]
    Pretty,
    /// Single line, no trailing newline.
    Compact,
}

impl Encoding {
    /// Pick the encoding from the `compress_json` setting.
    pub fn from_compress(compress: bool) -> Self {
        if compress {
            Encoding::Compact
        } else {
            Encoding::Pretty
        }
    }
}

/// An ordered mapping of key path to translated string.
///
/// # Example
///
/// ```
/// use translatehub::core::document::{Document, Encoding};
/// use translatehub::core::types::KeyPath;
///
/// let mut doc = Document::new();
/// doc.insert(KeyPath::new("b").unwrap(), "2");
/// doc.insert(KeyPath::new("a").unwrap(), "1");
///
/// let bytes = doc.encode(Encoding::Compact);
/// assert_eq!(bytes, br#"{"a":"1","b":"2"}"#);
/// assert_eq!(Document::decode(&bytes).unwrap(), doc);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    entries: BTreeMap<KeyPath, String>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document holding every key of `keys` with an empty value.
    pub fn blank<'a>(keys: impl IntoIterator<Item = &'a KeyPath>) -> Self {
        Self {
            entries: keys.into_iter().map(|k| (k.clone(), String::new())).collect(),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value.
    pub fn get(&self, key: &KeyPath) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the document contains a key.
    pub fn contains(&self, key: &KeyPath) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: KeyPath, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key, value.into())
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &KeyPath) -> Option<String> {
        self.entries.remove(key)
    }

    /// Move a value from `from` to `to`. Returns `true` if `from` existed.
    ///
    /// An existing value under `to` is overwritten.
    pub fn rename(&mut self, from: &KeyPath, to: &KeyPath) -> bool {
        match self.entries.remove(from) {
            Some(value) => {
                self.entries.insert(to.clone(), value);
                true
            }
            None => false,
        }
    }

    /// Iterate over entries in canonical order.
    pub fn iter(&self) -> btree_map::Iter<'_, KeyPath, String> {
        self.entries.iter()
    }

    /// Iterate over keys in canonical order.
    pub fn keys(&self) -> btree_map::Keys<'_, KeyPath, String> {
        self.entries.keys()
    }

    /// The key set of this document.
    pub fn key_set(&self) -> BTreeSet<KeyPath> {
        self.entries.keys().cloned().collect()
    }

    /// Whether the value for `key` counts as translated.
    ///
    /// Whitespace-only values count as empty.
    pub fn is_filled(&self, key: &KeyPath) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    /// Make the key set equal to `schema`.
    ///
    /// Missing keys are inserted with an empty value. Keys absent from
    /// `schema` are removed when `prune` is set. Returns the number of
    /// keys added and removed.
    pub fn conform_to(&mut self, schema: &BTreeSet<KeyPath>, prune: bool) -> (usize, usize) {
        let mut added = 0;
        for key in schema {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), String::new());
                added += 1;
            }
        }

        let mut removed = 0;
        if prune {
            let before = self.entries.len();
            self.entries.retain(|k, _| schema.contains(k));
            removed = before - self.entries.len();
        }

        (added, removed)
    }

    /// Serialize in canonical key order.
    pub fn encode(&self, encoding: Encoding) -> Vec<u8> {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), Value::String(v.clone())))
            .collect();
        let value = Value::Object(map);

        // Serializing a map of strings cannot fail.
        match encoding {
            Encoding::Pretty => {
                let mut out = serde_json::to_vec_pretty(&value).unwrap_or_default();
                out.push(b'\n');
                out
            }
            Encoding::Compact => serde_json::to_vec(&value).unwrap_or_default(),
        }
    }

    /// Parse a document from bytes.
    ///
    /// # Errors
    ///
    /// Fails if the input is not a JSON object of string values keyed by
    /// valid key paths.
    pub fn decode(bytes: &[u8]) -> Result<Self, DocumentError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| DocumentError::Json(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(DocumentError::NotAnObject);
        };

        let mut entries = BTreeMap::new();
        for (key, value) in map {
            let Value::String(text) = value else {
                return Err(DocumentError::NonStringValue(key));
            };
            let key = KeyPath::new(key).map_err(|e| DocumentError::InvalidKey(e.to_string()))?;
            entries.insert(key, text);
        }
        Ok(Self { entries })
    }
}

impl FromIterator<(KeyPath, String)> for Document {
    fn from_iter<I: IntoIterator<Item = (KeyPath, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a KeyPath, &'a String);
    type IntoIter = btree_map::Iter<'a, KeyPath, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
