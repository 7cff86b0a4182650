//! `hotrules list`: print every execution context.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::log;

pub fn list_rules(config: Arc<Config>) -> Result<()> {
    let (coordinator, engine) = super::start(config, false)?;
    let generation = engine.current();
    coordinator.dispose();

    if generation.is_empty() {
        log!("list"; "no rules loaded");
        return Ok(());
    }
    for context in generation.contexts() {
        println!("{context}");
    }
    Ok(())
}
