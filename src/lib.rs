//! TranslateHub - keep translation files in step across languages
//!
//! A project is a directory with one subdirectory per language, each
//! holding one flat JSON document per namespace. TranslateHub keeps a
//! schema of keys for every namespace and makes sure each language has
//! every key of every namespace, so translators only ever fill values.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Project state, schema registry and structural operations
//! - [`core`] - Domain types, documents, file layout, storage and config
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. After a successful operation every language has every namespace,
//!    and every document holds exactly the namespace schema
//! 2. Documents are written atomically in canonical key order
//! 3. A structural operation on a namespace excludes value flushes on it
//! 4. Partial failures are reported per language, never swallowed
//! 5. A removal some language missed is finished by the next sync, not
//!    undone by it

pub mod cli;
pub mod core;
pub mod engine;
pub mod ui;
