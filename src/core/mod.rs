//! core
//!
//! Core domain types, persistence, and configuration for TranslateHub.
//!
//! # Modules
//!
//! - [`types`] - Strong types: LanguageId, NamespaceId, KeyPath, etc.
//! - [`paths`] - Centralized path routing for the project tree
//! - [`config`] - Configuration schema and loading
//! - [`document`] - Ordered key/value documents and their JSON encoding
//! - [`store`] - Atomic flat-file persistence
//! - [`ops`] - Per-namespace exclusion tokens
//! - [`tombstones`] - Removals not yet applied to every document
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid identifiers at compile time
//! - Documents are always held and written in canonical order
//! - Writes are atomic per file

pub mod config;
pub mod document;
pub mod ops;
pub mod paths;
pub mod store;
pub mod tombstones;
pub mod types;
