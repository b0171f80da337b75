//! engine
//!
//! Schema synchronization, statistics and the structural-operation
//! lifecycle.
//!
//! # Architecture
//!
//! ```text
//! Coordinator -> SchemaRegistry (update + persist) -> Synchronizer -> DocumentStore
//!                                                                        |
//!                                        stats / query  <----------------+
//! ```
//!
//! - [`project`] - The open project context and its lifecycle
//! - [`schema`] - Canonical key sets per namespace
//! - [`sync`] - Reconciling documents against a schema
//! - [`coordinator`] - Structural operations (keys, languages, namespaces)
//! - [`outcome`] - Operation results and the error taxonomy
//! - [`stats`] - Completion statistics and missing translations
//! - [`edits`] - Staged value edits
//! - [`autosave`] - Periodic flush of staged edits
//! - [`query`] - Search and export views
//!
//! # Invariants
//!
//! - After a completed reconcile every known language's document for a
//!   namespace has exactly the schema's key set
//! - The schema only loses keys through an explicit delete, rename or move
//! - Documents are always written in canonical key order
//! - Two structural operations on the same namespace never interleave
//!
//! The engine never prints. It reports through return values and
//! `tracing` events.
//!
//! # Example
//!
//! ```no_run
//! use translatehub::core::config::Config;
//! use translatehub::core::types::{KeyPath, NamespaceId};
//! use translatehub::engine::{stats, Project};
//!
//! let project = Project::open("locales", Config::load(None)?)?;
//! let common = NamespaceId::new("common")?;
//!
//! let outcome = project.coordinator().add_key(&common, &KeyPath::new("menu.open")?)?;
//! println!("{:?}", outcome);
//!
//! let snapshot = stats::snapshot(&project);
//! println!("{:.1}% complete", snapshot.overall.percent());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod autosave;
pub mod coordinator;
pub mod edits;
pub mod outcome;
pub mod project;
pub mod query;
pub mod schema;
pub mod stats;
pub mod sync;

pub use autosave::{AutoSaveHandle, AutoSaver};
pub use coordinator::{ConflictStrategy, Coordinator, NamespaceError, SyncReport};
pub use edits::FlushReport;
pub use outcome::{Applied, MutationError, Operation, Outcome, TargetFailure};
pub use project::{OpenError, Project};
pub use query::{ResolvedDocument, SearchHit};
pub use schema::{SchemaEntry, SchemaError, SchemaRegistry};
pub use stats::{Counts, MissingTranslation, Snapshot};
pub use sync::{ReconcileReport, Synchronizer};
