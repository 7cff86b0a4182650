//! A generation: every execution context of one successful load.

use std::sync::Arc;

use super::context::{Effect, ExecutionContext};
use super::event::ItemEvent;
use crate::loader::RuleInstance;

#[derive(Debug, Default)]
pub struct Generation {
    id: u64,
    instances: Vec<Arc<RuleInstance>>,
    contexts: Vec<ExecutionContext>,
}

impl Generation {
    pub fn build(id: u64, instances: Vec<Arc<RuleInstance>>) -> Self {
        let contexts = instances
            .iter()
            .flat_map(ExecutionContext::for_instance)
            .collect();
        Self {
            id,
            instances,
            contexts,
        }
    }

    /// Generation with no rules, active after a reset.
    pub fn empty(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn instances(&self) -> &[Arc<RuleInstance>] {
        &self.instances
    }

    pub fn contexts(&self) -> &[ExecutionContext] {
        &self.contexts
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Every context matching `event`; all of them fire.
    pub fn matching<'a>(
        &'a self,
        event: &ItemEvent,
    ) -> impl Iterator<Item = &'a ExecutionContext> {
        self.contexts.iter().filter(move |c| c.matches(event))
    }

    /// Invoke every matching context.
    pub fn fire(&self, event: &ItemEvent) -> Vec<(&ExecutionContext, Vec<Effect>)> {
        self.matching(event)
            .map(|context| (context, context.invoke(event)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::UnitPack;
    use crate::loader::ClassPath;
    use crate::unit::{Action, CompiledRule, CompiledUnit, TriggerKind, UnitKind};

    fn rule(name: &str, to: Option<&str>) -> CompiledRule {
        CompiledRule {
            name: name.into(),
            item_name: "Door".into(),
            item_class: None,
            trigger: TriggerKind::Changed,
            from: None,
            to: to.map(Into::into),
            update: None,
            lt: None,
            lte: None,
            gt: None,
            gte: None,
            event_parameter: false,
            actions: vec![Action::Log { log: name.into() }],
        }
    }

    fn generation() -> Generation {
        let unit = CompiledUnit {
            identifier: "ns.Door".into(),
            kind: UnitKind::Rule,
            is_abstract: false,
            constructible: true,
            extends: None,
            rules: vec![rule("any", None), rule("open", Some("OPEN")), rule("closed", Some("CLOSED"))],
            item: None,
            source_hash: String::new(),
        };
        let mut cp = ClassPath::new();
        cp.push_loaded_pack("t.pack", UnitPack::from_units([unit]));
        let instance = cp.resolve("ns.Door").unwrap().instantiate(&cp).unwrap();
        Generation::build(7, vec![Arc::new(instance)])
    }

    #[test]
    fn test_all_matching_contexts_fire() {
        let generation = generation();
        assert_eq!(generation.contexts().len(), 3);

        let fired = generation.fire(&ItemEvent::changed("Door", "CLOSED", "OPEN"));
        let names: Vec<_> = fired.iter().map(|(c, _)| c.rule_name()).collect();
        assert_eq!(names, ["ns.Door.any", "ns.Door.open"]);
        assert_eq!(fired[1].1, vec![Effect::Log("open".into())]);
    }

    #[test]
    fn test_empty_generation() {
        let generation = Generation::empty(3);
        assert_eq!(generation.id(), 3);
        assert!(generation.is_empty());
        assert_eq!(
            generation
                .matching(&ItemEvent::updated("Door", "OPEN"))
                .count(),
            0
        );
    }
}
