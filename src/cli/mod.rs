//! cli
//!
//! Command-line interface layer for TranslateHub.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Open the project and delegate to command handlers
//! - Does NOT touch translation files directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. All file changes flow through the
//! engine's coordinator or its staged-edit flush.

pub mod args;
pub mod commands;
pub mod logging;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::engine::Project;
use crate::ui::output::Verbosity;

/// Settings derived from global CLI flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Project root directory.
    pub root: PathBuf,
    /// Output verbosity.
    pub verbosity: Verbosity,
    /// Print machine-readable JSON.
    pub json: bool,
}

impl Context {
    /// Load configuration for the project root.
    pub fn load_config(&self) -> Result<Config> {
        Config::load(Some(&self.root)).context("Failed to load configuration")
    }

    /// Open the project, run `f`, then close it so staged edits are written.
    pub fn with_project<T>(&self, f: impl FnOnce(&Project) -> Result<T>) -> Result<T> {
        let config = self.load_config()?;
        let project = Project::open(&self.root, config)
            .with_context(|| format!("Failed to open project at {}", self.root.display()))?;

        let result = f(&project);
        let report = project.close(false).context("Failed to close project")?;
        for failure in &report.failed {
            crate::ui::output::warn(format!("not saved: {failure}"), self.verbosity);
        }
        result
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    logging::init(cli.debug);

    let ctx = Context {
        root: cli.root.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx)
}
