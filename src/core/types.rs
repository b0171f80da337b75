//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`LanguageId`] - Validated language identifier (a locale tag)
//! - [`NamespaceId`] - Validated namespace identifier
//! - [`KeyPath`] - Validated translation key path
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so every identifier reaching the engine is
//! already safe to use as a path component or document key.
//!
//! # Examples
//!
//! ```
//! use translatehub::core::types::{KeyPath, LanguageId, NamespaceId};
//!
//! let lang = LanguageId::new("pt-BR").unwrap();
//! let ns = NamespaceId::new("common.json").unwrap();
//! let key = KeyPath::new("section.label").unwrap();
//!
//! assert_eq!(ns.as_str(), "common");
//! assert_eq!(ns.file_name(), "common.json");
//!
//! assert!(KeyPath::new("section..label").unwrap().ensure_well_formed().is_err());
//! assert!(LanguageId::new("../etc").is_err());
//! # let _ = (lang, key);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File extension used for every namespace document.
pub const DOCUMENT_EXTENSION: &str = "json";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid language id: {0}")]
    InvalidLanguage(String),

    #[error("invalid namespace id: {0}")]
    InvalidNamespace(String),

    #[error("invalid key path: {0}")]
    InvalidKeyPath(String),
}

/// A validated language identifier.
///
/// Language ids name a directory under the project root, so they are
/// restricted to a conservative character set:
/// - Cannot be empty
/// - Cannot start with `.` (hidden directories are never languages)
/// - ASCII letters, digits, `-`, `_` and `@` only
///
/// # Example
///
/// ```
/// use translatehub::core::types::LanguageId;
///
/// assert!(LanguageId::new("en").is_ok());
/// assert!(LanguageId::new("zh_Hant").is_ok());
/// assert!(LanguageId::new("sr@latin").is_ok());
///
/// assert!(LanguageId::new("").is_err());
/// assert!(LanguageId::new(".git").is_err());
/// assert!(LanguageId::new("en/us").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageId(String);

impl LanguageId {
    /// Create a new validated language id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLanguage` if the id is empty, hidden, or
    /// contains characters outside the allowed set.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidLanguage(
                "language id cannot be empty".into(),
            ));
        }
        if id.starts_with('.') {
            return Err(TypeError::InvalidLanguage(
                "language id cannot start with '.'".into(),
            ));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@')))
        {
            return Err(TypeError::InvalidLanguage(format!(
                "language id cannot contain '{}'",
                c.escape_default()
            )));
        }
        Ok(())
    }

    /// Get the language id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LanguageId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LanguageId> for String {
    fn from(id: LanguageId) -> Self {
        id.0
    }
}

impl AsRef<str> for LanguageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated namespace identifier.
///
/// The namespace `common` is stored as `common.json` in every language
/// directory. A trailing `.json` given by the caller is stripped, so
/// `common` and `common.json` name the same namespace.
///
/// Rules (applied after stripping the extension):
/// - Cannot be empty
/// - Cannot start with `.`
/// - ASCII letters, digits, `-`, `_` and `.` only
///
/// # Example
///
/// ```
/// use translatehub::core::types::NamespaceId;
///
/// let ns = NamespaceId::new("common.json").unwrap();
/// assert_eq!(ns, NamespaceId::new("common").unwrap());
/// assert_eq!(ns.file_name(), "common.json");
///
/// assert!(NamespaceId::new(".json").is_err());
/// assert!(NamespaceId::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceId(String);

impl NamespaceId {
    /// Create a new validated namespace id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidNamespace` if the id violates the rules above.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        let suffix = format!(".{DOCUMENT_EXTENSION}");
        let id = match id.strip_suffix(&suffix) {
            Some(stem) => stem.to_string(),
            None => id,
        };
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidNamespace(
                "namespace id cannot be empty".into(),
            ));
        }
        if id.starts_with('.') {
            return Err(TypeError::InvalidNamespace(
                "namespace id cannot start with '.'".into(),
            ));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(TypeError::InvalidNamespace(format!(
                "namespace id cannot contain '{}'",
                c.escape_default()
            )));
        }
        Ok(())
    }

    /// Get the namespace id as a string slice (without extension).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this namespace's document, e.g. `common.json`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, DOCUMENT_EXTENSION)
    }
}

impl TryFrom<String> for NamespaceId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<NamespaceId> for String {
    fn from(id: NamespaceId) -> Self {
        id.0
    }
}

impl AsRef<str> for NamespaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A translation key path.
///
/// Key paths are `.` or `/` delimited identifiers such as `section.label`
/// or `errors/network.timeout`. They are unique within a namespace and
/// order lexicographically (byte order), which is the canonical order of
/// every persisted document.
///
/// Any non-empty string is a key path, so documents written by other
/// tools (keys like `Loading...` or `Are you sure?`) load unchanged.
/// Keys created through this crate must also be well formed, see
/// [`KeyPath::ensure_well_formed`]:
/// - No leading or trailing whitespace
/// - No control characters
/// - No empty segment (no leading/trailing delimiter, no `..`, `//`)
///
/// # Example
///
/// ```
/// use translatehub::core::types::KeyPath;
///
/// let key = KeyPath::new("menu/file.open").unwrap();
/// assert_eq!(key.segments().collect::<Vec<_>>(), vec!["menu", "file", "open"]);
/// assert!(key.ensure_well_formed().is_ok());
///
/// assert!(KeyPath::new("").is_err());
/// let loading = KeyPath::new("Loading...").unwrap();
/// assert!(loading.ensure_well_formed().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPath(String);

impl KeyPath {
    /// Characters that separate key path segments.
    pub const DELIMITERS: [char; 2] = ['.', '/'];

    /// Create a key path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidKeyPath` if the path is empty.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.is_empty() {
            return Err(TypeError::InvalidKeyPath(
                "key path cannot be empty".into(),
            ));
        }
        Ok(Self(path))
    }

    /// Check the rules for a newly created key.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidKeyPath` naming the broken rule.
    pub fn ensure_well_formed(&self) -> Result<(), TypeError> {
        let path = self.0.as_str();
        if path.trim() != path {
            return Err(TypeError::InvalidKeyPath(format!(
                "key path '{path}' has leading or trailing whitespace"
            )));
        }
        if path.chars().any(char::is_control) {
            return Err(TypeError::InvalidKeyPath(
                "key path cannot contain control characters".into(),
            ));
        }
        if path.split(Self::DELIMITERS).any(str::is_empty) {
            return Err(TypeError::InvalidKeyPath(format!(
                "key path '{path}' contains an empty segment"
            )));
        }
        Ok(())
    }

    /// Get the key path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(Self::DELIMITERS)
    }
}

impl TryFrom<String> for KeyPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<KeyPath> for String {
    fn from(key: KeyPath) -> Self {
        key.0
    }
}

impl AsRef<str> for KeyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for KeyPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp, displayed as RFC3339.
///
/// # Example
///
/// ```
/// use translatehub::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a filesystem modification time.
    pub fn from_system_time(time: std::time::SystemTime) -> Self {
        Self(chrono::DateTime::<chrono::Utc>::from(time))
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
