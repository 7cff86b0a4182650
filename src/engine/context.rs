//! Execution contexts: one bound trigger predicate plus its callable.

use std::fmt;
use std::sync::Arc;

use super::event::ItemEvent;
use crate::loader::RuleInstance;
use crate::unit::{Action, CompiledRule, TriggerKind};

/// Outcome of invoking a rule method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Command { item: String, command: String },
    Update { item: String, state: String },
    Log(String),
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command { item, command } => write!(f, "command {command} -> {item}"),
            Self::Update { item, state } => write!(f, "update {state} -> {item}"),
            Self::Log(message) => write!(f, "log: {message}"),
        }
    }
}

/// Immutable activation record of one rule method.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    rule_name: String,
    instance: Arc<RuleInstance>,
    method: usize,
    trigger: TriggerKind,
    item_name: String,
    item_class: Option<String>,
    from: Option<String>,
    to: Option<String>,
    update: Option<String>,
    lt: Option<f64>,
    lte: Option<f64>,
    gt: Option<f64>,
    gte: Option<f64>,
    event_parameter_present: bool,
}

impl ExecutionContext {
    /// One context per rule method of `instance`.
    pub fn for_instance(instance: &Arc<RuleInstance>) -> Vec<Self> {
        (0..instance.methods().len())
            .map(|method| Self::new(Arc::clone(instance), method))
            .collect()
    }

    fn new(instance: Arc<RuleInstance>, method: usize) -> Self {
        let rule: &CompiledRule = &instance.methods()[method];
        let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
        Self {
            rule_name: format!("{}.{}", instance.identifier(), rule.name),
            trigger: rule.trigger,
            item_name: rule.item_name.clone(),
            item_class: rule.item_class.clone(),
            from: non_empty(&rule.from),
            to: non_empty(&rule.to),
            update: non_empty(&rule.update),
            lt: rule.lt,
            lte: rule.lte,
            gt: rule.gt,
            gte: rule.gte,
            event_parameter_present: rule.event_parameter,
            method,
            instance,
        }
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn item_class(&self) -> Option<&str> {
        self.item_class.as_deref()
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn update(&self) -> Option<&str> {
        self.update.as_deref()
    }

    pub fn event_parameter_present(&self) -> bool {
        self.event_parameter_present
    }

    pub fn instance(&self) -> &Arc<RuleInstance> {
        &self.instance
    }

    fn rule(&self) -> &CompiledRule {
        &self.instance.methods()[self.method]
    }

    /// Human-readable trigger, e.g. `changed from ON to OFF`.
    pub fn trigger_full_string(&self) -> String {
        let trigger = self.trigger.as_str();
        match (&self.from, &self.to, &self.update) {
            (Some(from), Some(to), _) => format!("{trigger} from {from} to {to}"),
            (Some(from), None, _) => format!("{trigger} from {from}"),
            (None, Some(to), _) => format!("{trigger} to {to}"),
            (None, None, Some(update)) => format!("{trigger} {update}"),
            (None, None, None) => trigger.to_string(),
        }
    }

    /// Any threshold set: the payload must be read as a number.
    pub fn is_numeric_operation(&self) -> bool {
        self.lt.is_some() || self.lte.is_some() || self.gt.is_some() || self.gte.is_some()
    }

    /// Evaluate this context against one event, independently of all others.
    pub fn matches(&self, event: &ItemEvent) -> bool {
        if event.item != self.item_name || event.kind != self.trigger {
            return false;
        }

        match self.trigger {
            TriggerKind::Changed => {
                if let Some(from) = &self.from
                    && event.previous.as_deref() != Some(from.as_str())
                {
                    return false;
                }
                if let Some(to) = &self.to
                    && event.state != *to
                {
                    return false;
                }
            }
            TriggerKind::ReceivedUpdate | TriggerKind::ReceivedCommand => {
                if let Some(update) = &self.update
                    && event.state != *update
                {
                    return false;
                }
            }
        }

        if !self.is_numeric_operation() {
            return true;
        }
        let Some(value) = event.numeric_state() else {
            return false;
        };
        self.lt.is_none_or(|t| value < t)
            && self.lte.is_none_or(|t| value <= t)
            && self.gt.is_none_or(|t| value > t)
            && self.gte.is_none_or(|t| value >= t)
    }

    /// Run the method body for `event`.
    ///
    /// Event placeholders (`{item}`, `{state}`, `{previous}`) are filled in
    /// only when the method takes the event argument.
    pub fn invoke(&self, event: &ItemEvent) -> Vec<Effect> {
        let render = |template: &str| {
            if !self.event_parameter_present {
                return template.to_string();
            }
            template
                .replace("{item}", &event.item)
                .replace("{state}", &event.state)
                .replace("{previous}", event.previous.as_deref().unwrap_or(""))
        };

        self.rule()
            .actions
            .iter()
            .map(|action| match action {
                Action::Command { item, command } => Effect::Command {
                    item: render(item),
                    command: render(command),
                },
                Action::Update { item, update } => Effect::Update {
                    item: render(item),
                    state: render(update),
                },
                Action::Log { log } => Effect::Log(render(log)),
            })
            .collect()
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Item {} {}",
            self.rule_name,
            self.item_name,
            self.trigger_full_string()
        )?;
        for (op, value) in [("<", self.lt), ("<=", self.lte), (">", self.gt), (">=", self.gte)] {
            if let Some(value) = value {
                write!(f, " [{op} {value}]")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::UnitPack;
    use crate::loader::ClassPath;
    use crate::unit::{CompiledUnit, UnitKind};

    fn rule(trigger: TriggerKind) -> CompiledRule {
        CompiledRule {
            name: "r".into(),
            item_name: "Lamp".into(),
            item_class: Some("org.hotrules.items._Lamp".into()),
            trigger,
            from: None,
            to: None,
            update: None,
            lt: None,
            lte: None,
            gt: None,
            gte: None,
            event_parameter: false,
            actions: Vec::new(),
        }
    }

    fn context(rule: CompiledRule) -> ExecutionContext {
        let unit = CompiledUnit {
            identifier: "ns.Rules".into(),
            kind: UnitKind::Rule,
            is_abstract: false,
            constructible: true,
            extends: None,
            rules: vec![rule],
            item: None,
            source_hash: String::new(),
        };
        let mut cp = ClassPath::new();
        cp.push_loaded_pack("t.pack", UnitPack::from_units([unit]));
        let instance = Arc::new(cp.resolve("ns.Rules").unwrap().instantiate(&cp).unwrap());
        ExecutionContext::for_instance(&instance).remove(0)
    }

    #[test]
    fn test_trigger_full_string_precedence() {
        let mut r = rule(TriggerKind::Changed);
        r.from = Some("ON".into());
        r.to = Some(String::new());
        assert_eq!(context(r.clone()).trigger_full_string(), "changed from ON");

        r.to = Some("OFF".into());
        assert_eq!(context(r.clone()).trigger_full_string(), "changed from ON to OFF");

        r.from = None;
        assert_eq!(context(r.clone()).trigger_full_string(), "changed to OFF");

        r.to = None;
        r.update = Some("received".into());
        assert_eq!(context(r.clone()).trigger_full_string(), "changed received");

        r.update = None;
        assert_eq!(context(r).trigger_full_string(), "changed");
    }

    #[test]
    fn test_from_and_to_win_over_update() {
        let mut r = rule(TriggerKind::Changed);
        r.to = Some("ON".into());
        r.update = Some("ignored".into());
        assert_eq!(context(r).trigger_full_string(), "changed to ON");
    }

    #[test]
    fn test_is_numeric_operation() {
        assert!(!context(rule(TriggerKind::Changed)).is_numeric_operation());
        let setters: [fn(&mut CompiledRule); 4] = [
            |r| r.lt = Some(1.0),
            |r| r.lte = Some(1.0),
            |r| r.gt = Some(1.0),
            |r| r.gte = Some(1.0),
        ];
        for set in setters {
            let mut r = rule(TriggerKind::ReceivedUpdate);
            set(&mut r);
            assert!(context(r).is_numeric_operation());
        }
    }

    #[test]
    fn test_matches_transition() {
        let mut r = rule(TriggerKind::Changed);
        r.from = Some("OFF".into());
        r.to = Some("ON".into());
        let ctx = context(r);

        assert!(ctx.matches(&ItemEvent::changed("Lamp", "OFF", "ON")));
        assert!(!ctx.matches(&ItemEvent::changed("Lamp", "ON", "OFF")));
        assert!(!ctx.matches(&ItemEvent::changed("Other", "OFF", "ON")));
        assert!(!ctx.matches(&ItemEvent::updated("Lamp", "ON")));
    }

    #[test]
    fn test_matches_thresholds() {
        let mut r = rule(TriggerKind::ReceivedUpdate);
        r.gt = Some(20.0);
        r.lte = Some(25.0);
        let ctx = context(r);

        assert!(ctx.matches(&ItemEvent::updated("Lamp", "21.5")));
        assert!(ctx.matches(&ItemEvent::updated("Lamp", "25")));
        assert!(!ctx.matches(&ItemEvent::updated("Lamp", "20")));
        assert!(!ctx.matches(&ItemEvent::updated("Lamp", "warm")));
    }

    #[test]
    fn test_invoke_substitutes_only_with_event_parameter() {
        let mut r = rule(TriggerKind::ReceivedCommand);
        r.actions = vec![
            Action::Log {
                log: "{item} got {state}".into(),
            },
            Action::Update {
                item: "Mirror".into(),
                update: "{state}".into(),
            },
        ];
        let event = ItemEvent::command("Lamp", "ON");

        let without = context(r.clone()).invoke(&event);
        assert_eq!(without[0], Effect::Log("{item} got {state}".into()));

        r.event_parameter = true;
        let with = context(r).invoke(&event);
        assert_eq!(with[0], Effect::Log("Lamp got ON".into()));
        assert_eq!(
            with[1],
            Effect::Update {
                item: "Mirror".into(),
                state: "ON".into()
            }
        );
    }

    #[test]
    fn test_display() {
        let mut r = rule(TriggerKind::ReceivedUpdate);
        r.gte = Some(3.0);
        assert_eq!(
            context(r).to_string(),
            "ns.Rules.r: Item Lamp received update [>= 3]"
        );
    }
}
