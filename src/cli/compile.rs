//! `hotrules compile`: one full pass without watching.

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::config::Config;
use crate::log;

pub fn compile_rules(config: Arc<Config>) -> Result<()> {
    let (coordinator, engine) = super::start(config, false)?;
    let generation = engine.current();
    coordinator.dispose();

    if coordinator.items_stale() {
        bail!("items failed to compile");
    }
    if !coordinator.rules_compiled_ok() {
        bail!("rules failed to compile");
    }
    log!(
        "compile";
        "{} rule instance(s), {} execution context(s)",
        generation.instances().len(),
        generation.contexts().len()
    );
    Ok(())
}
