//! hotrules - hot-reloading rule pipeline.

#![allow(dead_code)]

mod archive;
mod cli;
mod compiler;
mod config;
mod coordinator;
mod core;
mod engine;
mod entity;
mod loader;
mod logger;
mod unit;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(Config::load(&cli)?);

    match &cli.command {
        Commands::Watch => cli::watch::watch_rules(config),
        Commands::Compile => cli::compile::compile_rules(config),
        Commands::List => cli::list::list_rules(config),
        Commands::Fire {
            item,
            state,
            previous,
            kind,
        } => {
            let event = cli::fire::build_event(item, state, previous.as_deref(), *kind);
            cli::fire::fire_event(config, &event)
        }
    }
}
