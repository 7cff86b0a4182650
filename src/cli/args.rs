//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Hot-reloading rule pipeline
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hotrules.toml)
    #[arg(short = 'C', long, default_value = "hotrules.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Working directory holding items, rules and compiled output
    #[arg(short = 'w', long, value_hint = clap::ValueHint::DirPath)]
    pub working_dir: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load the rules and reload them whenever a source changes
    #[command(visible_alias = "w")]
    Watch,

    /// Generate item stubs and compile items and rules once
    #[command(visible_alias = "c")]
    Compile,

    /// Print every active rule
    #[command(visible_alias = "l")]
    List,

    /// Deliver one item event to the rules and print what fires
    #[command(visible_alias = "f")]
    Fire {
        /// Item name
        item: String,

        /// New state or command
        state: String,

        /// Previous state (only for `changed`)
        #[arg(short, long)]
        previous: Option<String>,

        /// Event kind
        #[arg(short, long, value_enum, default_value = "changed")]
        kind: EventKind,
    },
}

/// Event kinds accepted by `fire`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Changed,
    Update,
    Command,
}
