use crate::unit::TriggerKind;

/// State notification for one item, as delivered by the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEvent {
    pub item: String,
    pub kind: TriggerKind,
    pub state: String,
    /// Previous state; only meaningful for `changed`.
    pub previous: Option<String>,
}

impl ItemEvent {
    pub fn changed(item: impl Into<String>, previous: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            kind: TriggerKind::Changed,
            state: state.into(),
            previous: Some(previous.into()),
        }
    }

    pub fn updated(item: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            kind: TriggerKind::ReceivedUpdate,
            state: state.into(),
            previous: None,
        }
    }

    pub fn command(item: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            kind: TriggerKind::ReceivedCommand,
            state: command.into(),
            previous: None,
        }
    }

    /// Payload as a number, for threshold predicates.
    pub fn numeric_state(&self) -> Option<f64> {
        self.state.trim().parse().ok()
    }
}
