//! Command-line interface module.

mod args;
pub mod compile;
pub mod fire;
pub mod list;
pub mod watch;

pub use args::{Cli, Commands, EventKind};

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::config::Config;
use crate::coordinator::{CoordinatorBuilder, LifecycleCoordinator, Phase};
use crate::engine::ActiveRules;
use crate::entity::StaticRegistry;

/// Build a coordinator over the configured entities and initialize it.
///
/// Fails when the folder layout cannot be created.
fn start(config: Arc<Config>, watch: bool) -> Result<(LifecycleCoordinator, Arc<ActiveRules>)> {
    let registry = Arc::new(StaticRegistry::from_config(&config.entities));
    let engine = Arc::new(ActiveRules::new());

    let mut builder = CoordinatorBuilder::new(config, registry, engine.clone());
    if !watch {
        builder = builder.without_watcher();
    }
    let coordinator = builder.build()?;

    if coordinator.initialize() == Phase::Uninitialized {
        bail!("failed to prepare {}", coordinator.config().working_dir().display());
    }
    Ok((coordinator, engine))
}
