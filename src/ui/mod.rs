//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing output goes through this module so that quiet and
//! JSON modes are honored everywhere. Diagnostics from the engine are
//! `tracing` events and are configured separately.

pub mod output;
