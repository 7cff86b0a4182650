//! `hotrules fire`: deliver one event and print the effects.

use std::sync::Arc;

use anyhow::Result;

use super::EventKind;
use crate::config::Config;
use crate::engine::ItemEvent;
use crate::log;

/// Build the event `fire` delivers.
pub fn build_event(item: &str, state: &str, previous: Option<&str>, kind: EventKind) -> ItemEvent {
    match kind {
        EventKind::Changed => ItemEvent::changed(item, previous.unwrap_or_default(), state),
        EventKind::Update => ItemEvent::updated(item, state),
        EventKind::Command => ItemEvent::command(item, state),
    }
}

pub fn fire_event(config: Arc<Config>, event: &ItemEvent) -> Result<()> {
    let (coordinator, engine) = super::start(config, false)?;
    let fired = engine.dispatch(event);
    coordinator.dispose();

    if fired.is_empty() {
        log!("fire"; "no rule matched {} {}", event.item, event.kind.as_str());
        return Ok(());
    }
    for (rule, effects) in &fired {
        println!("{rule}");
        for effect in effects {
            println!("  {effect}");
        }
    }
    Ok(())
}
