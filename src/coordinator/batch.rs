use std::path::PathBuf;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::debug;
use crate::watch::{ChangeKind, WatchNotification};

/// Watch notifications waiting for the debounce window to close.
///
/// A burst of changes becomes one reload. Per path:
/// - Deleted + Created/Modified: the new event (file restored)
/// - any + Deleted: Deleted
/// - otherwise the first event wins
///
/// A path never leaves the burst once seen: every burst reloads.
pub(super) struct PendingChanges {
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    window: Duration,
}

impl PendingChanges {
    pub(super) fn new(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            window,
        }
    }

    pub(super) fn add(&mut self, notification: WatchNotification) {
        let WatchNotification { kind, path } = notification;
        self.last_event = Some(Instant::now());

        let Some(&existing) = self.changes.get(&path) else {
            self.changes.insert(path, kind);
            return;
        };

        match (existing, kind) {
            (ChangeKind::Deleted, ChangeKind::Created | ChangeKind::Modified) => {
                debug!("watch"; "restored: {}", path.display());
                self.changes.insert(path, kind);
            }
            (ChangeKind::Created | ChangeKind::Modified, ChangeKind::Deleted) => {
                self.changes.insert(path, ChangeKind::Deleted);
            }
            _ => {}
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// When the window closes, if anything is pending.
    pub(super) fn deadline(&self) -> Option<Instant> {
        let last = self.last_event?;
        (!self.changes.is_empty()).then(|| last + self.window)
    }

    /// Take the burst once the window has closed.
    pub(super) fn take_if_ready(&mut self) -> Option<Vec<WatchNotification>> {
        let deadline = self.deadline()?;
        if Instant::now() < deadline {
            return None;
        }

        self.last_event = None;
        let mut changes: Vec<_> = std::mem::take(&mut self.changes)
            .into_iter()
            .map(|(path, kind)| WatchNotification { kind, path })
            .collect();
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Some(changes)
    }
}
