//! `hotrules watch`: run until Ctrl+C.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::core::register_shutdown;
use crate::log;

pub fn watch_rules(config: Arc<Config>) -> Result<()> {
    // Register before initializing so Ctrl+C during the first compile
    // still disposes cleanly.
    let shutdown = register_shutdown();
    let (coordinator, _engine) = super::start(config, true)?;

    if !coordinator.watcher_running() {
        log!("watch"; "watcher is not running, rules will not reload");
    }
    log!("watch"; "{} - press Ctrl+C to stop", coordinator.phase());

    let _ = shutdown.recv();
    coordinator.dispose();
    Ok(())
}
