//! Raw notify events to source notifications.

use std::path::Path;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

use super::types::{ChangeKind, WatchNotification};
use crate::log;
use crate::utils::path::has_extension;

/// Turn one notify event into zero or more notifications for files with
/// extension `ext`.
///
/// Overflow (rescan) events and metadata-only modifications are dropped.
/// Renames become a deletion of the old name and a creation of the new one.
pub fn classify(event: &Event, ext: &str) -> Vec<WatchNotification> {
    if event.need_rescan() {
        log!("watch"; "event overflow, changes may be missed: {:?}", event.paths);
        return Vec::new();
    }

    let kinds: Vec<ChangeKind> = match event.kind {
        EventKind::Create(_) => vec![ChangeKind::Created],
        EventKind::Remove(_) => vec![ChangeKind::Deleted],
        EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => vec![ChangeKind::Deleted],
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => vec![ChangeKind::Created],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            vec![ChangeKind::Deleted, ChangeKind::Created]
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                if p.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                }
            })
            .collect(),
        EventKind::Modify(_) => vec![ChangeKind::Modified],
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .enumerate()
        .filter(|(_, path)| has_extension(path, ext) && !is_temp_file(path))
        .map(|(i, path)| {
            let kind = kinds.get(i).or(kinds.last()).copied().unwrap_or(ChangeKind::Modified);
            WatchNotification::new(kind, path.clone())
        })
        .collect()
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
