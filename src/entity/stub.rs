//! Item stub rendering.
//!
//! Each entity becomes one `_<Name>.rule` source of `kind = "item"` in the
//! items namespace. Rules reference items by name; the compiled stub is what
//! makes the name resolvable.

use serde::Serialize;

use super::Entity;
use crate::unit::{ItemDecl, SOURCE_EXT, STUB_PREFIX};

/// Renders the source text of an entity stub.
pub trait StubGenerator: Send + Sync {
    fn render(&self, entity: &Entity, namespace: &str) -> String;
}

/// File name of the stub generated for `entity_name`.
pub fn stub_file_name(entity_name: &str) -> String {
    format!("{STUB_PREFIX}{entity_name}.{SOURCE_EXT}")
}

/// Qualified identifier of the stub generated for `entity_name`.
pub fn stub_identifier(namespace: &str, entity_name: &str) -> String {
    format!("{namespace}.{STUB_PREFIX}{entity_name}")
}

#[derive(Serialize)]
struct StubDocument<'a> {
    package: &'a str,
    name: String,
    kind: &'static str,
    constructor: bool,
    item: ItemDecl,
}

/// Default generator emitting TOML item sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlStubGenerator;

impl StubGenerator for TomlStubGenerator {
    fn render(&self, entity: &Entity, namespace: &str) -> String {
        let doc = StubDocument {
            package: namespace,
            name: format!("{STUB_PREFIX}{}", entity.name),
            kind: "item",
            constructor: false,
            item: ItemDecl {
                name: entity.name.clone(),
                item_type: entity.item_type.clone(),
                label: entity.label.clone(),
            },
        };
        // Plain strings and a flat table; serialization cannot fail.
        let body = toml::to_string(&doc).unwrap_or_default();
        format!("# generated from entity `{}`, do not edit\n{body}", entity.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_names() {
        assert_eq!(stub_file_name("Lamp"), "_Lamp.rule");
        assert_eq!(
            stub_identifier("org.hotrules.items", "Lamp"),
            "org.hotrules.items._Lamp"
        );
    }

    #[test]
    fn test_render_is_item_source() {
        let entity = Entity::new("Lamp", "Switch").with_label("Desk \"lamp\"");
        let text = TomlStubGenerator.render(&entity, "org.hotrules.items");

        let value: toml::Value = toml::from_str(&text).unwrap();
        assert_eq!(value["package"].as_str(), Some("org.hotrules.items"));
        assert_eq!(value["name"].as_str(), Some("_Lamp"));
        assert_eq!(value["kind"].as_str(), Some("item"));
        assert_eq!(value["constructor"].as_bool(), Some(false));
        assert_eq!(value["item"]["type"].as_str(), Some("Switch"));
        assert_eq!(value["item"]["label"].as_str(), Some("Desk \"lamp\""));
    }

    #[test]
    fn test_render_is_deterministic() {
        let entity = Entity::new("Lamp", "Switch");
        assert_eq!(
            TomlStubGenerator.render(&entity, "ns"),
            TomlStubGenerator.render(&entity, "ns")
        );
    }
}
