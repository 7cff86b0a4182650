//! Shutdown state.
//!
//! `SHUTDOWN_TX` wakes the thread blocked in `watch` once registered.

use std::sync::OnceLock;

use crossbeam::channel::{self, Receiver, Sender};

/// Shutdown signal sender for the long-running command
static SHUTDOWN_TX: OnceLock<Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
///
/// - Before `register_shutdown()`: exit immediately, nothing to dispose
/// - After `register_shutdown()`: graceful shutdown through the channel
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if !request_shutdown() {
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register for graceful shutdown; the receiver fires once on Ctrl+C.
pub fn register_shutdown() -> Receiver<()> {
    let (tx, rx) = channel::bounded(1);
    match SHUTDOWN_TX.set(tx) {
        Ok(()) => rx,
        // Only the first registration is woken.
        Err(_) => channel::never(),
    }
}

/// Notify a registered waiter of shutdown.
///
/// Returns whether a waiter was registered.
pub fn request_shutdown() -> bool {
    match SHUTDOWN_TX.get() {
        Some(tx) => {
            crate::log!("watch"; "shutting down...");
            let _ = tx.try_send(());
            true
        }
        None => false,
    }
}
