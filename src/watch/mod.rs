//! Source directory watcher.
//!
//! ```text
//! Idle --start--> Watching --event--> Notifying --> Watching
//!                    |
//!                    +--stop / root removed / error--> Stopped
//! ```
//!
//! The whole tree below the root is watched recursively, including
//! directories created after start. Notifications are sent on the watcher
//! thread to every listener channel; listeners whose receiver is gone are
//! dropped. Errors end the thread; there is no automatic restart, callers
//! check [`WatcherHandle::is_running`].

mod filter;
mod types;

pub use filter::{classify, is_temp_file};
pub use types::{ChangeKind, WatchExit, WatchNotification};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use notify::{RecursiveMode, Watcher};

use crate::{debug, log};

/// How long `start` waits for the watch to be registered.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ChangeWatcher {
    root: PathBuf,
    extension: String,
    listeners: Vec<Sender<WatchNotification>>,
}

impl ChangeWatcher {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register a new listener and return its receiving end.
    pub fn subscribe(&mut self) -> Receiver<WatchNotification> {
        let (tx, rx) = channel::unbounded();
        self.listeners.push(tx);
        rx
    }

    /// Spawn the watcher thread.
    ///
    /// Returns once the watch is registered (or the thread has given up), so
    /// changes made right after `start` are not missed.
    pub fn start(self) -> WatcherHandle {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let (ready_tx, ready_rx) = channel::bounded::<()>(1);
        let running = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&running);
        let spawned = std::thread::Builder::new()
            .name("hotrules-watch".into())
            .spawn(move || {
                let exit = self.run(&stop_rx, &ready_tx);
                flag.store(false, Ordering::SeqCst);
                exit
            });

        let thread = match spawned {
            Ok(thread) => {
                // Sender dropped without a message means the thread exited early.
                let _ = ready_rx.recv_timeout(READY_TIMEOUT);
                Some(thread)
            }
            Err(e) => {
                log!("error"; "failed to spawn watcher thread: {}", e);
                running.store(false, Ordering::SeqCst);
                None
            }
        };

        WatcherHandle {
            stop_tx,
            thread,
            running,
        }
    }

    fn run(mut self, stop_rx: &Receiver<()>, ready_tx: &Sender<()>) -> WatchExit {
        if !self.root.is_dir() {
            log!("watch"; "{} is not a directory, watcher not started", self.root.display());
            return WatchExit::NotADirectory;
        }

        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = match notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        }) {
            Ok(w) => w,
            Err(e) => return fail(format!("cannot create watcher: {e}")),
        };
        if let Err(e) = watcher.watch(&self.root, RecursiveMode::Recursive) {
            return fail(format!("cannot watch {}: {e}", self.root.display()));
        }

        log!("watch"; "watching {}", self.root.display());
        let _ = ready_tx.send(());

        loop {
            channel::select! {
                recv(stop_rx) -> _ => {
                    debug!("watch"; "watcher interrupted");
                    return WatchExit::Interrupted;
                }
                recv(event_rx) -> msg => {
                    let event = match msg {
                        Ok(Ok(event)) => event,
                        Ok(Err(e)) => return fail(format!("watch error: {e}")),
                        Err(_) => return fail("event source closed".to_string()),
                    };
                    if !self.root.is_dir() {
                        log!("watch"; "{} was removed, watcher stopped", self.root.display());
                        return WatchExit::RootInvalidated;
                    }
                    debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
                    for notification in classify(&event, &self.extension) {
                        self.notify(notification);
                    }
                }
            }
        }
    }

    /// Deliver to every live listener, dropping disconnected ones.
    fn notify(&mut self, notification: WatchNotification) {
        debug!("watch"; "{} {}", notification.kind.label(), notification.path.display());
        self.listeners
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

fn fail(message: String) -> WatchExit {
    log!("error"; "{}", message);
    WatchExit::Failed(message)
}

/// Control handle of a running watcher thread.
pub struct WatcherHandle {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<WatchExit>>,
    running: Arc<AtomicBool>,
}

impl WatcherHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Interrupt and join the thread. Best effort: a panicked thread
    /// yields `None`.
    pub fn stop(&mut self) -> Option<WatchExit> {
        let _ = self.stop_tx.try_send(());
        self.thread.take()?.join().ok()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
