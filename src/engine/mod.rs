//! Rule engine seam.
//!
//! The coordinator hands each successfully loaded [`Generation`] to a
//! [`RuleEngine`]. [`ActiveRules`] is the in-process engine: it keeps the
//! active generation behind an `ArcSwap`, so dispatch never blocks on a
//! reload and an old generation is dropped once the last reader lets go.

mod context;
mod event;
mod generation;

pub use context::{Effect, ExecutionContext};
pub use event::ItemEvent;
pub use generation::Generation;

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{debug, log};

/// Downstream consumer of execution contexts.
pub trait RuleEngine: Send + Sync {
    /// Drop every active context.
    fn reset(&self);

    /// Replace the active contexts with `generation`.
    fn activate(&self, generation: Arc<Generation>);
}

/// Source of item events feeding the engine.
pub trait EventSubscriber: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Subscriber for hosts that deliver events themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubscriber;

impl EventSubscriber for NoopSubscriber {
    fn start(&self) {}
    fn stop(&self) {}
}

/// In-process engine holding the active generation.
#[derive(Debug)]
pub struct ActiveRules {
    current: ArcSwap<Generation>,
}

impl Default for ActiveRules {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(Generation::empty(0)),
        }
    }
}

impl ActiveRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active generation.
    pub fn current(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    /// Fire every context matching `event` and return what they did.
    pub fn dispatch(&self, event: &ItemEvent) -> Vec<(String, Vec<Effect>)> {
        let generation = self.current.load();
        generation
            .fire(event)
            .into_iter()
            .map(|(context, effects)| {
                debug!("engine"; "{} fired {} effect(s)", context.rule_name(), effects.len());
                (context.rule_name().to_string(), effects)
            })
            .collect()
    }
}

impl RuleEngine for ActiveRules {
    fn reset(&self) {
        let id = self.current.load().id();
        self.current.store(Arc::new(Generation::empty(id)));
    }

    fn activate(&self, generation: Arc<Generation>) {
        log!(
            "engine";
            "generation {} active with {} rule(s)",
            generation.id(),
            generation.contexts().len()
        );
        self.current.store(generation);
    }
}
