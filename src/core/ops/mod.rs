//! core::ops
//!
//! Coordination primitives for structural operations.
//!
//! # Modules
//!
//! - [`lock`] - Per-namespace exclusion tokens
//!
//! # Architecture
//!
//! Every structural operation:
//! 1. Acquires the tokens of the namespaces it touches
//! 2. Updates and persists the schema entry
//! 3. Reconciles the affected language documents
//! 4. Releases the tokens when the guard drops

pub mod lock;

pub use lock::{Held, NamespaceGuard, NamespaceLocks};
