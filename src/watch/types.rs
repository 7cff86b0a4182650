use std::path::PathBuf;

/// What happened to a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

/// One qualifying source change, as sent to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchNotification {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl WatchNotification {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Why the watcher thread ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchExit {
    /// Stopped through its handle.
    Interrupted,
    /// The watched root disappeared.
    RootInvalidated,
    NotADirectory,
    Failed(String),
}
