use std::fmt;

/// Lifecycle phase of the coordinator.
///
/// ```text
/// Uninitialized -> FoldersReady -> StubsGenerated -> ItemsCompiled
///   -> RulesCompiled -> InstancesLoaded -> Watching <-> Reloading
///   -> Disposed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    FoldersReady,
    StubsGenerated,
    ItemsCompiled,
    RulesCompiled,
    InstancesLoaded,
    Watching,
    Reloading,
    Disposed,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::FoldersReady => "folders ready",
            Self::StubsGenerated => "stubs generated",
            Self::ItemsCompiled => "items compiled",
            Self::RulesCompiled => "rules compiled",
            Self::InstancesLoaded => "instances loaded",
            Self::Watching => "watching",
            Self::Reloading => "reloading",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the coordinator mutates, guarded by one lock.
#[derive(Debug)]
pub(super) struct State {
    pub phase: Phase,
    /// The items archive no longer reflects the stubs on disk.
    pub items_stale: bool,
    /// Id of the last generation handed to the engine.
    pub generation: u64,
    /// Last rules compilation succeeded.
    pub rules_ok: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            // Nothing has been packed yet.
            items_stale: true,
            generation: 0,
            rules_ok: false,
        }
    }
}
