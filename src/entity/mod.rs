//! Entity collaborators: the registry the items come from and the stub
//! generator that turns each entity into an item source unit.

mod registry;
mod stub;

pub use registry::{EntityRegistry, RegistryEvent, StaticRegistry};
pub use stub::{StubGenerator, TomlStubGenerator, stub_file_name, stub_identifier};

use crate::config::EntityConfig;

/// A named entity tracked by the host (a switch, a sensor, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub item_type: String,
    pub label: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_type: item_type.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<&EntityConfig> for Entity {
    fn from(cfg: &EntityConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            item_type: cfg.item_type.clone(),
            label: cfg.label.clone(),
        }
    }
}
