//! Entity registry trait and the config-backed implementation.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::Entity;
use crate::config::EntityConfig;

/// Notification from the registry about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(Entity),
    Updated(Entity),
    Removed(String),
}

impl RegistryEvent {
    pub fn entity_name(&self) -> &str {
        match self {
            Self::Added(e) | Self::Updated(e) => &e.name,
            Self::Removed(name) => name,
        }
    }
}

/// Snapshot access to the tracked entities.
pub trait EntityRegistry: Send + Sync {
    fn entities(&self) -> Vec<Entity>;

    fn get(&self, name: &str) -> Option<Entity> {
        self.entities().into_iter().find(|e| e.name == name)
    }
}

/// In-memory registry seeded from `[[entity]]` tables.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    entities: RwLock<BTreeMap<String, Entity>>,
}

impl StaticRegistry {
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: RwLock::new(
                entities
                    .into_iter()
                    .map(|e| (e.name.clone(), e))
                    .collect(),
            ),
        }
    }

    pub fn from_config(entities: &[EntityConfig]) -> Self {
        Self::new(entities.iter().map(Entity::from))
    }

    /// Insert or replace an entity, returning the matching event.
    pub fn upsert(&self, entity: Entity) -> RegistryEvent {
        let previous = self
            .entities
            .write()
            .insert(entity.name.clone(), entity.clone());
        match previous {
            Some(_) => RegistryEvent::Updated(entity),
            None => RegistryEvent::Added(entity),
        }
    }

    /// Remove an entity; `None` when it was not registered.
    pub fn remove(&self, name: &str) -> Option<RegistryEvent> {
        self.entities
            .write()
            .remove(name)
            .map(|e| RegistryEvent::Removed(e.name))
    }
}

impl EntityRegistry for StaticRegistry {
    fn entities(&self) -> Vec<Entity> {
        self.entities.read().values().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<Entity> {
        self.entities.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_reports_added_then_updated() {
        let registry = StaticRegistry::default();
        assert!(matches!(
            registry.upsert(Entity::new("Lamp", "Switch")),
            RegistryEvent::Added(_)
        ));
        let event = registry.upsert(Entity::new("Lamp", "Dimmer"));
        assert!(matches!(event, RegistryEvent::Updated(_)));
        assert_eq!(registry.get("Lamp").unwrap().item_type, "Dimmer");
    }

    #[test]
    fn test_remove() {
        let registry = StaticRegistry::new([Entity::new("Lamp", "Switch")]);
        assert_eq!(
            registry.remove("Lamp"),
            Some(RegistryEvent::Removed("Lamp".into()))
        );
        assert_eq!(registry.remove("Lamp"), None);
        assert!(registry.entities().is_empty());
    }

    #[test]
    fn test_entities_sorted_by_name() {
        let registry = StaticRegistry::new([
            Entity::new("Zone", "String"),
            Entity::new("Alarm", "Switch"),
        ]);
        let names: Vec<_> = registry.entities().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["Alarm", "Zone"]);
    }
}
