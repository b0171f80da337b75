//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--root <path>`: Project root (default: current directory)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output
//!
//! Identifiers are validated while parsing, so a malformed language,
//! namespace or key is rejected before the project is opened.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::{KeyPath, LanguageId, NamespaceId, TypeError};
use crate::engine::ConflictStrategy;

/// TranslateHub - keep translation files in step across languages
#[derive(Parser, Debug)]
#[command(name = "th")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add, rename, delete or list keys of a namespace
    #[command(
        name = "key",
        after_help = "\
WORKFLOW EXAMPLES:
    # Add a key; every language receives it with an empty value
    th key add common menu.open

    # Rename a key, keeping every language's translation
    th key rename common menu.open menu.open_file

    # Delete a key from every language (cannot be undone)
    th key delete common menu.legacy"
    )]
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Add, rename, delete or list languages
    #[command(
        name = "lang",
        after_help = "\
WORKFLOW EXAMPLES:
    # Add a language; it receives every namespace with empty values
    th lang add fr

    # Rename a language directory
    th lang rename pt pt-BR"
    )]
    Lang {
        #[command(subcommand)]
        action: LangAction,
    },

    /// Add, rename, delete or list namespaces
    #[command(name = "ns")]
    Ns {
        #[command(subcommand)]
        action: NsAction,
    },

    /// Rebuild schemas from the documents and reconcile every language
    #[command(
        name = "sync",
        long_about = "Synchronize keys across languages.\n\n\
            Every key found in any language joins the namespace schema, then every \
            language's document is brought in line with it: missing keys are added \
            with empty values and files are rewritten in canonical order.\n\n\
            With --no-rebuild the schema is left as is and keys absent from it are \
            removed from the documents."
    )]
    Sync {
        /// Only this namespace
        #[arg(long, value_parser = parse_namespace)]
        namespace: Option<NamespaceId>,

        /// Reconcile against the current schema without rebuilding it
        #[arg(long)]
        no_rebuild: bool,
    },

    /// Show translation completion statistics
    #[command(name = "stats")]
    Stats {
        /// Only this language
        #[arg(long, value_parser = parse_language)]
        language: Option<LanguageId>,

        /// Only this namespace
        #[arg(long, value_parser = parse_namespace)]
        namespace: Option<NamespaceId>,
    },

    /// List keys without a translation
    #[command(name = "missing")]
    Missing {
        /// Only this language
        #[arg(long, value_parser = parse_language)]
        language: Option<LanguageId>,

        /// Only this namespace
        #[arg(long, value_parser = parse_namespace)]
        namespace: Option<NamespaceId>,
    },

    /// Set the value of an existing key
    #[command(name = "set")]
    Set {
        #[arg(value_parser = parse_language)]
        language: LanguageId,
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
        #[arg(value_parser = parse_key)]
        key: KeyPath,
        value: String,
    },

    /// Show values of a namespace or of one key
    #[command(name = "show")]
    Show {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,

        /// Only this key
        #[arg(value_parser = parse_key)]
        key: Option<KeyPath>,

        /// Only this language
        #[arg(long, value_parser = parse_language)]
        language: Option<LanguageId>,
    },

    /// Search keys and values
    #[command(name = "search")]
    Search {
        query: String,

        /// Match case exactly
        #[arg(short = 's', long)]
        case_sensitive: bool,
    },

    /// Move keys with their values to another namespace
    #[command(
        name = "move-keys",
        after_help = "\
WORKFLOW EXAMPLES:
    # Move two keys; keys already in the target are skipped
    th move-keys common dialogs button.ok button.cancel

    # Keep both on collision (moved key becomes common_button.ok)
    th move-keys common dialogs button.ok --on-conflict keep-both"
    )]
    MoveKeys {
        #[arg(value_parser = parse_namespace)]
        from: NamespaceId,
        #[arg(value_parser = parse_namespace)]
        to: NamespaceId,

        /// Keys to move
        #[arg(required = true, value_parser = parse_key)]
        keys: Vec<KeyPath>,

        /// What to do when a key exists in the target
        #[arg(long, value_enum, default_value_t = ConflictArg::Skip)]
        on_conflict: ConflictArg,
    },

    /// Write schema-complete documents to a directory
    #[command(name = "export")]
    Export {
        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Languages to export (default: all)
        #[arg(long = "language", value_parser = parse_language)]
        languages: Vec<LanguageId>,

        /// Namespaces to export (default: all)
        #[arg(long = "namespace", value_parser = parse_namespace)]
        namespaces: Vec<NamespaceId>,
    },

    /// Show configuration values
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    th completion bash >> ~/.bashrc

    # Fish
    th completion fish > ~/.config/fish/completions/th.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Key subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum KeyAction {
    /// Add a key to a namespace
    Add {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
        #[arg(value_parser = parse_new_key)]
        key: KeyPath,
    },
    /// Rename a key, keeping its values
    Rename {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
        #[arg(value_parser = parse_key)]
        from: KeyPath,
        #[arg(value_parser = parse_new_key)]
        to: KeyPath,
    },
    /// Delete a key from every language
    Delete {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
        #[arg(value_parser = parse_key)]
        key: KeyPath,
    },
    /// List the keys of a namespace
    List {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
    },
}

/// Language subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum LangAction {
    /// Add a language
    Add {
        #[arg(value_parser = parse_language)]
        language: LanguageId,
    },
    /// Rename a language
    Rename {
        #[arg(value_parser = parse_language)]
        from: LanguageId,
        #[arg(value_parser = parse_language)]
        to: LanguageId,
    },
    /// Delete a language and its documents
    Delete {
        #[arg(value_parser = parse_language)]
        language: LanguageId,
    },
    /// List languages
    List,
}

/// Namespace subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum NsAction {
    /// Add a namespace
    Add {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
    },
    /// Rename a namespace
    Rename {
        #[arg(value_parser = parse_namespace)]
        from: NamespaceId,
        #[arg(value_parser = parse_namespace)]
        to: NamespaceId,
    },
    /// Delete a namespace from every language
    Delete {
        #[arg(value_parser = parse_namespace)]
        namespace: NamespaceId,
    },
    /// List namespaces
    List,
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show effective configuration and where it was loaded from
    Show,
}

/// Conflict handling for `move-keys`
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictArg {
    /// Leave colliding keys in the source namespace
    Skip,
    /// Overwrite the target's values
    Replace,
    /// Move under <source>_<key>
    KeepBoth,
}

impl From<ConflictArg> for ConflictStrategy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Skip => ConflictStrategy::Skip,
            ConflictArg::Replace => ConflictStrategy::Replace,
            ConflictArg::KeepBoth => ConflictStrategy::KeepBoth,
        }
    }
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

fn parse_language(s: &str) -> Result<LanguageId, TypeError> {
    LanguageId::new(s)
}

fn parse_namespace(s: &str) -> Result<NamespaceId, TypeError> {
    NamespaceId::new(s)
}

fn parse_key(s: &str) -> Result<KeyPath, TypeError> {
    KeyPath::new(s)
}

fn parse_new_key(s: &str) -> Result<KeyPath, TypeError> {
    let key = KeyPath::new(s)?;
    key.ensure_well_formed()?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_key_add() {
        let cli = Cli::try_parse_from(["th", "key", "add", "common", "menu.open"]).unwrap();
        match cli.command {
            Command::Key {
                action: KeyAction::Add { namespace, key },
            } => {
                assert_eq!(namespace.as_str(), "common");
                assert_eq!(key.as_str(), "menu.open");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_key() {
        assert!(Cli::try_parse_from(["th", "key", "add", "common", "a..b"]).is_err());
        assert!(Cli::try_parse_from(["th", "key", "rename", "common", "a", "b/"]).is_err());
    }

    #[test]
    fn existing_keys_addressed_verbatim() {
        let cli = Cli::try_parse_from(["th", "key", "delete", "common", "Loading..."]).unwrap();
        match cli.command {
            Command::Key {
                action: KeyAction::Delete { key, .. },
            } => assert_eq!(key.as_str(), "Loading..."),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["th", "stats", "--json", "--root", "/tmp/p"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.root, PathBuf::from("/tmp/p"));
    }

    #[test]
    fn move_keys_requires_keys() {
        assert!(Cli::try_parse_from(["th", "move-keys", "a", "b"]).is_err());
        let cli =
            Cli::try_parse_from(["th", "move-keys", "a", "b", "k", "--on-conflict", "keep-both"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::MoveKeys {
                on_conflict: ConflictArg::KeepBoth,
                ..
            }
        ));
    }
}
