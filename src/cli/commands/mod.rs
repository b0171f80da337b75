//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the project through [`Context::with_project`]
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT write translation files directly.
//!
//! # Exit Status
//!
//! A degraded outcome (schema updated, some languages not) prints every
//! failed target and exits non-zero so scripts can retry.

mod completion;
mod config_cmd;
mod export;
mod key;
mod lang;
mod move_keys;
mod ns;
mod search;
mod stats;
mod sync;
mod values;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use config_cmd::show as config_show;
pub use export::export;
pub use move_keys::move_keys;
pub use search::search;
pub use stats::{missing, stats};
pub use sync::sync;
pub use values::{set, show};

use anyhow::{bail, Result};

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use crate::engine::Outcome;
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        // Structure
        Command::Key { action } => key::run(ctx, action),
        Command::Lang { action } => lang::run(ctx, action),
        Command::Ns { action } => ns::run(ctx, action),
        Command::MoveKeys {
            from,
            to,
            keys,
            on_conflict,
        } => move_keys::move_keys(ctx, &from, &to, &keys, on_conflict.into()),
        Command::Sync {
            namespace,
            no_rebuild,
        } => sync::sync(ctx, namespace.as_ref(), no_rebuild),

        // Values
        Command::Set {
            language,
            namespace,
            key,
            value,
        } => values::set(ctx, &language, &namespace, &key, &value),
        Command::Show {
            namespace,
            key,
            language,
        } => values::show(ctx, &namespace, key.as_ref(), language.as_ref()),

        // Read-only views
        Command::Stats {
            language,
            namespace,
        } => stats::stats(ctx, language.as_ref(), namespace.as_ref()),
        Command::Missing {
            language,
            namespace,
        } => stats::missing(ctx, language.as_ref(), namespace.as_ref()),
        Command::Search {
            query,
            case_sensitive,
        } => search::search(ctx, &query, case_sensitive),
        Command::Export {
            out,
            languages,
            namespaces,
        } => export::export(ctx, &out, &languages, &namespaces),

        // Setup
        Command::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Print an operation outcome; fail if it was only partially applied.
pub(crate) fn report_outcome(ctx: &Context, outcome: Outcome) -> Result<()> {
    if ctx.json {
        output::json(&outcome)?;
    } else {
        match &outcome {
            Outcome::Complete(applied) => output::success(
                format!(
                    "{} ({} document(s) updated)",
                    applied.operation, applied.documents_touched
                ),
                ctx.verbosity,
            ),
            Outcome::Degraded { applied, failures } => {
                output::print(
                    format!("{} (partially applied)", applied.operation),
                    ctx.verbosity,
                );
                for failure in failures {
                    output::error(format!("not updated: {failure}"));
                }
            }
            Outcome::Unchanged { notice } => output::print(notice, ctx.verbosity),
        }
    }

    if !outcome.is_complete() {
        let languages = outcome.failed_languages();
        bail!(
            "{} language(s) not updated: {}; run `th sync` to repair",
            languages.len(),
            output::format_list(&languages, "").replace('\n', ", ")
        );
    }
    Ok(())
}
