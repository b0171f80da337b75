//! engine::outcome
//!
//! Result values and errors of structural operations.
//!
//! # Taxonomy
//!
//! | Condition | Representation |
//! |-----------|----------------|
//! | Filesystem failure before anything changed | [`MutationError::Io`] |
//! | Change collides with existing state | [`MutationError::Conflict`] |
//! | Malformed identifier or request | [`MutationError::Validation`] |
//! | Named language/namespace/key does not exist | [`MutationError::NotFound`] |
//! | Schema updated, some languages failed | [`Outcome::Degraded`] (or [`MutationError::PartialFailure`] via [`Outcome::into_result`]) |
//!
//! An `Err` always means the schema registry and the document store are
//! in their previous state. A degraded outcome means the schema holds the
//! new state and every listed target can be repaired by a later
//! synchronization.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::core::store::StoreError;
use crate::core::types::{KeyPath, LanguageId, NamespaceId, TypeError};

/// A structural operation, used for reporting and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddKey {
        namespace: NamespaceId,
        key: KeyPath,
    },
    RenameKey {
        namespace: NamespaceId,
        from: KeyPath,
        to: KeyPath,
    },
    DeleteKey {
        namespace: NamespaceId,
        key: KeyPath,
    },
    MoveKeys {
        from: NamespaceId,
        to: NamespaceId,
        keys: Vec<KeyPath>,
    },
    AddLanguage {
        language: LanguageId,
    },
    RenameLanguage {
        from: LanguageId,
        to: LanguageId,
    },
    DeleteLanguage {
        language: LanguageId,
    },
    AddNamespace {
        namespace: NamespaceId,
    },
    RenameNamespace {
        from: NamespaceId,
        to: NamespaceId,
    },
    DeleteNamespace {
        namespace: NamespaceId,
    },
    Reconcile {
        namespace: NamespaceId,
    },
    Synchronize {
        namespace: NamespaceId,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddKey { namespace, key } => write!(f, "add key {namespace}:{key}"),
            Operation::RenameKey {
                namespace,
                from,
                to,
            } => write!(f, "rename key {namespace}:{from} -> {to}"),
            Operation::DeleteKey { namespace, key } => write!(f, "delete key {namespace}:{key}"),
            Operation::MoveKeys { from, to, keys } => {
                write!(f, "move {} key(s) {from} -> {to}", keys.len())
            }
            Operation::AddLanguage { language } => write!(f, "add language {language}"),
            Operation::RenameLanguage { from, to } => write!(f, "rename language {from} -> {to}"),
            Operation::DeleteLanguage { language } => write!(f, "delete language {language}"),
            Operation::AddNamespace { namespace } => write!(f, "add namespace {namespace}"),
            Operation::RenameNamespace { from, to } => {
                write!(f, "rename namespace {from} -> {to}")
            }
            Operation::DeleteNamespace { namespace } => write!(f, "delete namespace {namespace}"),
            Operation::Reconcile { namespace } => write!(f, "reconcile {namespace}"),
            Operation::Synchronize { namespace } => write!(f, "synchronize {namespace}"),
        }
    }
}

/// One (language, namespace) unit that could not be updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFailure {
    pub language: LanguageId,
    pub namespace: NamespaceId,
    pub path: PathBuf,
    pub reason: String,
}

impl TargetFailure {
    /// Build a failure record from a store error.
    pub fn from_store(language: &LanguageId, namespace: &NamespaceId, err: &StoreError) -> Self {
        Self {
            language: language.clone(),
            namespace: namespace.clone(),
            path: err.path().to_path_buf(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.language, self.namespace, self.reason)
    }
}

/// What an applied operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub operation: Operation,
    /// Documents (language files) written or removed.
    pub documents_touched: usize,
}

/// Result of a structural operation that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Schema and every affected document are durably updated.
    Complete(Applied),

    /// Schema updated; the listed targets were not.
    Degraded {
        applied: Applied,
        failures: Vec<TargetFailure>,
    },

    /// Nothing needed to change.
    Unchanged { notice: String },
}

impl Outcome {
    /// Build from an applied operation and the failures collected on the way.
    pub fn from_parts(applied: Applied, failures: Vec<TargetFailure>) -> Self {
        if failures.is_empty() {
            Outcome::Complete(applied)
        } else {
            Outcome::Degraded { applied, failures }
        }
    }

    /// Failing targets, if any.
    pub fn failures(&self) -> &[TargetFailure] {
        match self {
            Outcome::Degraded { failures, .. } => failures,
            _ => &[],
        }
    }

    /// Languages that need a retry.
    pub fn failed_languages(&self) -> Vec<LanguageId> {
        let mut langs: Vec<_> = self.failures().iter().map(|f| f.language.clone()).collect();
        langs.sort();
        langs.dedup();
        langs
    }

    /// Whether the operation fully applied (or had nothing to do).
    pub fn is_complete(&self) -> bool {
        !matches!(self, Outcome::Degraded { .. })
    }

    /// Treat a degraded outcome as an error.
    pub fn into_result(self) -> Result<Outcome, MutationError> {
        match self {
            Outcome::Degraded { applied, failures } => Err(MutationError::PartialFailure {
                operation: applied.operation,
                failures,
            }),
            other => Ok(other),
        }
    }
}

/// Errors from structural operations and value edits.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Filesystem failure; nothing was changed.
    #[error(transparent)]
    Io(#[from] StoreError),

    /// The change collides with existing state; nothing was changed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input, rejected before any state change.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A named language, namespace or key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Applied to the schema but not to every language.
    #[error("{operation} partially applied; failed for {}", format_failures(.failures))]
    PartialFailure {
        operation: Operation,
        failures: Vec<TargetFailure>,
    },

    /// The project has been closed.
    #[error("project is closed")]
    Closed,
}

impl From<TypeError> for MutationError {
    fn from(err: TypeError) -> Self {
        MutationError::Validation(err.to_string())
    }
}

fn format_failures(failures: &[TargetFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}/{}", f.language, f.namespace))
        .collect::<Vec<_>>()
        .join(", ")
}
