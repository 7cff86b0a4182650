//! Loaded type handles and rule instances.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashSet;

use super::LoadError;
use super::classpath::ClassPath;
use crate::unit::{CompiledRule, CompiledUnit, UnitKind};

/// Zero-argument construction capability of a type.
///
/// Decided once when the type is loaded; instantiation only asks whether
/// the handle carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constructor;

/// A resolved type, valid for the class path generation that produced it.
#[derive(Debug)]
pub struct LoadedType {
    unit: CompiledUnit,
    constructor: Option<Constructor>,
}

impl LoadedType {
    pub(super) fn new(unit: CompiledUnit) -> Self {
        let constructor = unit.constructible.then_some(Constructor);
        Self { unit, constructor }
    }

    pub fn identifier(&self) -> &str {
        &self.unit.identifier
    }

    pub fn kind(&self) -> UnitKind {
        self.unit.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.unit.is_abstract
    }

    pub fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    pub fn unit(&self) -> &CompiledUnit {
        &self.unit
    }

    /// Create an instance, pulling rule methods up the `extends` chain.
    ///
    /// Methods declared closer to this type shadow inherited ones of the
    /// same name.
    pub fn instantiate(self: &Arc<Self>, classpath: &ClassPath) -> Result<RuleInstance, LoadError> {
        if self.is_abstract() {
            return Err(LoadError::Abstract(self.identifier().to_string()));
        }
        if self.constructor.is_none() {
            return Err(LoadError::NoConstructor(self.identifier().to_string()));
        }

        let mut methods: Vec<CompiledRule> = Vec::new();
        let mut seen_types = FxHashSet::default();
        let mut current = Arc::clone(self);

        loop {
            if !seen_types.insert(current.identifier().to_string()) {
                return Err(LoadError::Cycle(current.identifier().to_string()));
            }
            for rule in &current.unit.rules {
                if !methods.iter().any(|m| m.name == rule.name) {
                    methods.push(rule.clone());
                }
            }
            let Some(base) = current.unit.extends.clone() else {
                break;
            };
            let next = classpath
                .resolve(&base)
                .map_err(|_| LoadError::UnresolvedBase {
                    identifier: current.identifier().to_string(),
                    base,
                })?;
            current = next;
        }

        Ok(RuleInstance {
            id: next_instance_id(),
            ty: Arc::clone(self),
            methods,
        })
    }
}

fn next_instance_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// A live instance of a rule unit.
#[derive(Debug)]
pub struct RuleInstance {
    id: u64,
    ty: Arc<LoadedType>,
    methods: Vec<CompiledRule>,
}

impl RuleInstance {
    /// Process-unique instance number.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn identifier(&self) -> &str {
        self.ty.identifier()
    }

    pub fn loaded_type(&self) -> &Arc<LoadedType> {
        &self.ty
    }

    /// Own and inherited rule methods.
    pub fn methods(&self) -> &[CompiledRule] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&CompiledRule> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::UnitPack;
    use crate::unit::TriggerKind;

    fn rule(name: &str) -> CompiledRule {
        CompiledRule {
            name: name.into(),
            item_name: "Lamp".into(),
            item_class: None,
            trigger: TriggerKind::Changed,
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

    fn unit(id: &str, extends: Option<&str>, rules: &[&str]) -> CompiledUnit {
        CompiledUnit {
            identifier: id.into(),
            kind: UnitKind::Rule,
            is_abstract: false,
            constructible: true,
            extends: extends.map(Into::into),
            rules: rules.iter().map(|r| rule(r)).collect(),
            item: None,
            source_hash: String::new(),
        }
    }

    fn classpath(units: Vec<CompiledUnit>) -> ClassPath {
        let mut cp = ClassPath::new();
        cp.push_loaded_pack("test.pack", UnitPack::from_units(units));
        cp
    }

    #[test]
    fn test_inherited_methods_with_override() {
        let mut base = unit("ns.Base", None, &["shared", "base_only"]);
        base.is_abstract = true;
        let cp = classpath(vec![base, unit("ns.Child", Some("ns.Base"), &["shared", "own"])]);

        let instance = cp.resolve("ns.Child").unwrap().instantiate(&cp).unwrap();
        let names: Vec<_> = instance.methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["shared", "own", "base_only"]);
    }

    #[test]
    fn test_abstract_and_no_constructor_refuse() {
        let mut abstract_unit = unit("ns.Abstract", None, &[]);
        abstract_unit.is_abstract = true;
        let mut data = unit("ns.Data", None, &[]);
        data.constructible = false;
        let cp = classpath(vec![abstract_unit, data]);

        let ty = cp.resolve("ns.Data").unwrap();
        assert!(ty.constructor().is_none());
        assert!(matches!(ty.instantiate(&cp), Err(LoadError::NoConstructor(_))));
        assert!(matches!(
            cp.resolve("ns.Abstract").unwrap().instantiate(&cp),
            Err(LoadError::Abstract(_))
        ));
    }

    #[test]
    fn test_cycle_and_missing_base() {
        let cp = classpath(vec![
            unit("ns.A", Some("ns.B"), &[]),
            unit("ns.B", Some("ns.A"), &[]),
            unit("ns.Orphan", Some("ns.Gone"), &[]),
        ]);
        assert!(matches!(
            cp.resolve("ns.A").unwrap().instantiate(&cp),
            Err(LoadError::Cycle(_))
        ));
        assert!(matches!(
            cp.resolve("ns.Orphan").unwrap().instantiate(&cp),
            Err(LoadError::UnresolvedBase { .. })
        ));
    }

    #[test]
    fn test_instances_are_distinct() {
        let cp = classpath(vec![unit("ns.R", None, &["r"])]);
        let ty = cp.resolve("ns.R").unwrap();
        let a = ty.instantiate(&cp).unwrap();
        let b = ty.instantiate(&cp).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(Arc::ptr_eq(a.loaded_type(), b.loaded_type()));
    }
}
