use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use super::*;
use crate::archive::{PackWriter, Packager};
use crate::unit::{CompiledUnit, UnitKind, artifact_path_for};

/// Native toolchain that remembers which sources it was handed.
#[derive(Default)]
struct RecordingToolchain {
    seen: Mutex<Vec<String>>,
}

impl Toolchain for RecordingToolchain {
    fn name(&self) -> &str {
        "recording"
    }

    fn compile(
        &self,
        sources: &[SourceUnit],
        classpath: &ClassPath,
        output_root: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        self.seen
            .lock()
            .extend(sources.iter().map(|s| s.name().to_string()));
        NativeToolchain.compile(sources, classpath, output_root)
    }
}

fn setup() -> (TempDir, Arc<Config>) {
    let temp = TempDir::new().unwrap();
    let config = Config::for_root(temp.path());
    fs::create_dir_all(config.items_namespace_dir()).unwrap();
    fs::create_dir_all(config.rules_dir()).unwrap();
    fs::create_dir_all(config.rule_classes_dir()).unwrap();
    (temp, Arc::new(config))
}

fn write_item_stub(config: &Config, name: &str) {
    let text = format!(
        "package = \"{}\"\nkind = \"item\"\nconstructor = false\n\n[item]\nname = \"{name}\"\ntype = \"Switch\"\n",
        config.namespace.items
    );
    fs::write(config.items_namespace_dir().join(format!("_{name}.rule")), text).unwrap();
}

fn write_rule(config: &Config, rel: &str, body: &str) {
    let path = config.rules_dir().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        path,
        format!("package = \"{}\"\n{body}", config.namespace.rules),
    )
    .unwrap();
}

#[test]
fn test_stale_only_skips_existing_artifact_even_if_source_changed() {
    let (_temp, config) = setup();
    write_item_stub(&config, "Foo");
    write_item_stub(&config, "Bar");

    // Stale artifact for Foo with content that no longer matches its source.
    let foo_id = format!("{}._Foo", config.namespace.items);
    let stale = CompiledUnit {
        identifier: foo_id.clone(),
        kind: UnitKind::Item,
        is_abstract: false,
        constructible: false,
        extends: None,
        rules: Vec::new(),
        item: None,
        source_hash: "stale".into(),
    };
    stale.write(config.items_dir()).unwrap();

    let toolchain = Arc::new(RecordingToolchain::default());
    let compiler = Compiler::new(Arc::clone(&config), toolchain.clone());
    let outcome = compiler.compile_items().unwrap();

    assert!(outcome.succeeded());
    assert_eq!(*toolchain.seen.lock(), vec!["_Bar".to_string()]);

    let foo = CompiledUnit::read(&artifact_path_for(config.items_dir(), &foo_id)).unwrap();
    assert_eq!(foo.source_hash, "stale");
    assert!(
        artifact_path_for(config.items_dir(), &format!("{}._Bar", config.namespace.items))
            .is_file()
    );
}

#[test]
fn test_stale_only_nothing_to_do() {
    let (_temp, config) = setup();
    let toolchain = Arc::new(RecordingToolchain::default());
    let compiler = Compiler::new(Arc::clone(&config), toolchain.clone());

    let outcome = compiler.compile_items().unwrap();
    assert_eq!(outcome.sources, 0);
    assert!(toolchain.seen.lock().is_empty());
}

#[test]
fn test_compile_rules_removes_orphans_with_no_sources() {
    let (_temp, config) = setup();
    let orphan = CompiledUnit {
        identifier: format!("{}.gone.Orphan", config.namespace.rules),
        kind: UnitKind::Rule,
        is_abstract: false,
        constructible: true,
        extends: None,
        rules: Vec::new(),
        item: None,
        source_hash: String::new(),
    };
    let path = orphan.write(config.rule_classes_dir()).unwrap();
    assert!(path.exists());

    let compiler = Compiler::new(Arc::clone(&config), Arc::new(NativeToolchain));
    let outcome = compiler.compile_rules().unwrap();

    assert_eq!(outcome.sources, 0);
    assert!(!path.exists());
}

#[test]
fn test_items_then_rules_against_items_pack() {
    let (_temp, config) = setup();
    write_item_stub(&config, "Lamp");
    write_rule(
        &config,
        "lights/Hallway.rule",
        "\n[[rule]]\nname = \"on\"\nitem = \"Lamp\"\ntrigger = \"received command\"\nupdate = \"ON\"\n",
    );

    let compiler = Compiler::new(Arc::clone(&config), Arc::new(NativeToolchain));
    assert!(compiler.compile_items().unwrap().succeeded());
    PackWriter
        .pack(config.items_dir(), &config.items_pack())
        .unwrap();

    let outcome = compiler.compile_rules().unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.diagnostics);

    let unit = CompiledUnit::read(&artifact_path_for(
        config.rule_classes_dir(),
        &format!("{}.Hallway", config.namespace.rules),
    ))
    .unwrap();
    assert_eq!(
        unit.rules[0].item_class.as_deref(),
        Some(format!("{}._Lamp", config.namespace.items).as_str())
    );
}

#[test]
fn test_compile_rules_reports_diagnostics() {
    let (_temp, config) = setup();
    write_rule(
        &config,
        "Broken.rule",
        "\n[[rule]]\nname = \"r\"\nitem = \"Ghost\"\ntrigger = \"sometimes\"\n",
    );
    write_rule(
        &config,
        "Unknown.rule",
        "\n[[rule]]\nname = \"r\"\nitem = \"Ghost\"\ntrigger = \"changed\"\n",
    );

    let compiler = Compiler::new(Arc::clone(&config), Arc::new(NativeToolchain));
    let outcome = compiler.compile_rules().unwrap();

    assert!(!outcome.succeeded());
    assert!(outcome.written.is_empty());
    let messages: Vec<_> = outcome.diagnostics.iter().map(|d| d.to_string()).collect();
    assert!(messages.iter().any(|m| m.contains("unknown trigger `sometimes`")));
    assert!(messages.iter().any(|m| m.contains("unknown item `Ghost`")));
    assert!(collect_files(config.rule_classes_dir(), ARTIFACT_EXT).is_empty());
}

#[test]
fn test_rules_classpath_ignores_unreadable_extlib() {
    let (_temp, config) = setup();
    fs::create_dir_all(config.extlib_dir()).unwrap();
    fs::write(config.extlib_dir().join("broken.pack"), "not an archive").unwrap();
    crate::archive::UnitPack::from_units([])
        .save(&config.extlib_dir().join("empty.pack"))
        .unwrap();

    let cp = rules_classpath(&config);
    let paths: Vec<_> = cp.paths().map(Path::to_path_buf).collect();
    assert!(paths.contains(&config.extlib_dir().join("empty.pack")));
    assert!(!paths.contains(&config.extlib_dir().join("broken.pack")));
    assert!(cp.contains(crate::archive::RUNTIME_BASE));
}

#[test]
fn test_toolchain_for_defaults_to_native() {
    let (_temp, config) = setup();
    assert_eq!(toolchain_for(&config).unwrap().name(), "native");
}
