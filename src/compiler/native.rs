//! Built-in toolchain for `*.rule` sources.
//!
//! Two passes: every source is parsed and checked on its own (in parallel),
//! then the batch is checked as a whole (duplicate identifiers, item and
//! base type references). Artifacts are written only when both passes are
//! clean.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use toml::Spanned;

use super::toolchain::{CompileError, CompileOutcome, Diagnostic, Toolchain};
use crate::config::is_valid_namespace;
use crate::loader::ClassPath;
use crate::unit::{
    Action, CompiledRule, CompiledUnit, ItemDecl, SourceUnit, TriggerKind, UnitKind,
};
use crate::utils::hash::ContentHash;
use crate::utils::path::file_stem_str;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeToolchain;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceDoc {
    package: Option<Spanned<String>>,
    name: Option<Spanned<String>>,
    #[serde(default)]
    kind: UnitKind,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default = "default_constructor")]
    constructor: bool,
    extends: Option<Spanned<String>>,
    #[serde(default, rename = "rule")]
    rules: Vec<RuleDoc>,
    item: Option<ItemDecl>,
}

fn default_constructor() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDoc {
    name: Spanned<String>,
    item: Spanned<String>,
    trigger: Spanned<String>,
    from: Option<String>,
    to: Option<String>,
    update: Option<String>,
    lt: Option<f64>,
    lte: Option<f64>,
    gt: Option<f64>,
    gte: Option<f64>,
    #[serde(default)]
    event: bool,
    #[serde(default)]
    actions: Vec<Action>,
}

/// A source that passed the per-file checks.
struct ParsedUnit {
    path: PathBuf,
    unit: CompiledUnit,
    extends_line: usize,
    /// Line of each rule's `item` key, parallel to `unit.rules`.
    item_lines: Vec<usize>,
}

/// 1-based line of a byte offset.
fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

fn parse_source(source: &SourceUnit) -> Result<ParsedUnit, Vec<Diagnostic>> {
    let path = &source.path;
    let text = fs::read_to_string(path)
        .map_err(|e| vec![Diagnostic::new(path, 0, format!("cannot read source: {e}"))])?;

    let doc: SourceDoc = toml::from_str(&text).map_err(|e| {
        let line = e.span().map_or(0, |span| line_of(&text, span.start));
        vec![Diagnostic::new(path, line, e.message().trim().to_string())]
    })?;

    let mut diagnostics = Vec::new();
    let mut error = |line: usize, message: String| {
        diagnostics.push(Diagnostic::new(path, line, message));
    };
    let line = |span: std::ops::Range<usize>| line_of(&text, span.start);

    let stem = file_stem_str(path);
    if let Some(name) = &doc.name
        && name.get_ref() != stem
    {
        error(
            line(name.span()),
            format!("unit name `{}` does not match file name `{stem}`", name.get_ref()),
        );
    }

    let package = match &doc.package {
        None => {
            error(1, "missing `package` declaration".to_string());
            String::new()
        }
        Some(package) if !is_valid_namespace(package.get_ref()) => {
            error(
                line(package.span()),
                format!("invalid package `{}`", package.get_ref()),
            );
            String::new()
        }
        Some(package) => package.get_ref().clone(),
    };

    if doc.kind == UnitKind::Item && doc.item.is_none() {
        error(1, "item unit without an `[item]` table".to_string());
    }

    let mut rules = Vec::with_capacity(doc.rules.len());
    let mut item_lines = Vec::with_capacity(doc.rules.len());
    let mut rule_names = FxHashSet::default();

    for rule in doc.rules {
        let name_line = line(rule.name.span());
        if !rule_names.insert(rule.name.get_ref().clone()) {
            error(name_line, format!("duplicate rule `{}`", rule.name.get_ref()));
        }

        let trigger = match rule.trigger.get_ref().parse::<TriggerKind>() {
            Ok(trigger) => trigger,
            Err(message) => {
                error(line(rule.trigger.span()), message);
                continue;
            }
        };
        if trigger != TriggerKind::Changed && (rule.from.is_some() || rule.to.is_some()) {
            error(
                line(rule.trigger.span()),
                format!("`from`/`to` only apply to `changed` triggers, not `{trigger}`"),
            );
        }
        if rule.lt.is_some() && rule.lte.is_some() {
            error(name_line, "`lt` and `lte` are mutually exclusive".to_string());
        }
        if rule.gt.is_some() && rule.gte.is_some() {
            error(name_line, "`gt` and `gte` are mutually exclusive".to_string());
        }

        item_lines.push(line(rule.item.span()));
        rules.push(CompiledRule {
            name: rule.name.into_inner(),
            item_name: rule.item.into_inner(),
            item_class: None,
            trigger,
            from: rule.from.filter(|s| !s.is_empty()),
            to: rule.to.filter(|s| !s.is_empty()),
            update: rule.update.filter(|s| !s.is_empty()),
            lt: rule.lt,
            lte: rule.lte,
            gt: rule.gt,
            gte: rule.gte,
            event_parameter: rule.event,
            actions: rule.actions,
        });
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let extends_line = doc.extends.as_ref().map_or(0, |e| line(e.span()));
    Ok(ParsedUnit {
        path: path.clone(),
        unit: CompiledUnit {
            identifier: format!("{package}.{stem}"),
            kind: doc.kind,
            is_abstract: doc.is_abstract,
            constructible: doc.constructor,
            extends: doc.extends.map(Spanned::into_inner),
            rules,
            item: doc.item,
            source_hash: ContentHash::of(&text).to_hex(),
        },
        extends_line,
        item_lines,
    })
}

/// Cross-unit checks; fills in `item_class` on success.
fn link_batch(parsed: &mut [ParsedUnit], classpath: &ClassPath) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let mut identifiers: FxHashMap<&str, &Path> = FxHashMap::default();
    let mut batch_items: FxHashMap<String, String> = FxHashMap::default();
    for p in parsed.iter() {
        if let Some(first) = identifiers.insert(&p.unit.identifier, &p.path) {
            diagnostics.push(Diagnostic::new(
                &p.path,
                1,
                format!(
                    "duplicate unit `{}` (also declared in {})",
                    p.unit.identifier,
                    first.display()
                ),
            ));
        }
        if let Some(item) = &p.unit.item {
            batch_items
                .entry(item.name.clone())
                .or_insert_with(|| p.unit.identifier.clone());
        }
    }
    let declared: FxHashSet<String> = identifiers.keys().map(|s| s.to_string()).collect();

    for p in parsed.iter_mut() {
        if let Some(base) = &p.unit.extends
            && !declared.contains(base)
            && !classpath.contains(base)
        {
            diagnostics.push(Diagnostic::new(
                &p.path,
                p.extends_line,
                format!("cannot resolve base unit `{base}`"),
            ));
        }

        for (rule, &item_line) in p.unit.rules.iter_mut().zip(&p.item_lines) {
            let class = batch_items
                .get(&rule.item_name)
                .cloned()
                .or_else(|| classpath.find_item(&rule.item_name).map(str::to_string));
            match class {
                Some(class) => rule.item_class = Some(class),
                None => diagnostics.push(Diagnostic::new(
                    &p.path,
                    item_line,
                    format!("unknown item `{}`", rule.item_name),
                )),
            }
        }
    }

    diagnostics
}

impl Toolchain for NativeToolchain {
    fn name(&self) -> &str {
        "native"
    }

    fn compile(
        &self,
        sources: &[SourceUnit],
        classpath: &ClassPath,
        output_root: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        let results: Vec<_> = sources.par_iter().map(parse_source).collect();

        let mut diagnostics = Vec::new();
        let mut parsed = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(unit) => parsed.push(unit),
                Err(errors) => diagnostics.extend(errors),
            }
        }
        diagnostics.extend(link_batch(&mut parsed, classpath));

        let mut outcome = CompileOutcome {
            sources: sources.len(),
            ..CompileOutcome::default()
        };

        if !diagnostics.is_empty() {
            diagnostics.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));
            outcome.diagnostics = diagnostics;
            return Ok(outcome);
        }

        fs::create_dir_all(output_root)
            .map_err(|e| CompileError::Output(output_root.to_path_buf(), e))?;
        for p in &parsed {
            outcome.written.push(p.unit.write(output_root)?);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{RUNTIME_BASE, runtime_pack};
    use tempfile::TempDir;

    fn source(dir: &Path, name: &str, text: &str) -> SourceUnit {
        let path = dir.join(format!("{name}.rule"));
        fs::write(&path, text).unwrap();
        SourceUnit::scan(&path)
    }

    fn item_source(dir: &Path, name: &str) -> SourceUnit {
        source(
            dir,
            &format!("_{name}"),
            &format!(
                "package = \"org.hotrules.items\"\nkind = \"item\"\nconstructor = false\n\n[item]\nname = \"{name}\"\ntype = \"Switch\"\n"
            ),
        )
    }

    fn runtime_classpath() -> ClassPath {
        let mut cp = ClassPath::new();
        cp.push_loaded_pack("runtime.pack", runtime_pack());
        cp
    }

    #[test]
    fn test_compiles_rules_against_batch_items() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let out = temp.path().join("out");
        fs::create_dir_all(&src).unwrap();

        let lamp = item_source(&src, "Lamp");
        let rule = source(
            &src,
            "Lights",
            &format!(
                r#"package = "org.hotrules.rules.user"
extends = "{RUNTIME_BASE}"

[[rule]]
name = "on"
item = "Lamp"
trigger = "changed"
from = "OFF"
to = "ON"
gt = 20
event = true
actions = [{{ item = "Lamp", command = "OFF" }}]
"#
            ),
        );

        let outcome = NativeToolchain
            .compile(&[lamp, rule], &runtime_classpath(), &out)
            .unwrap();
        assert!(outcome.succeeded(), "{:?}", outcome.diagnostics);
        assert_eq!(outcome.written.len(), 2);

        let unit = CompiledUnit::read(&out.join("org/hotrules/rules/user/Lights.unit")).unwrap();
        let rule = &unit.rules[0];
        assert_eq!(rule.item_class.as_deref(), Some("org.hotrules.items._Lamp"));
        assert_eq!(rule.gt, Some(20.0));
        assert!(rule.event_parameter);
        assert_eq!(unit.extends.as_deref(), Some(RUNTIME_BASE));
    }

    #[test]
    fn test_failed_batch_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let good = item_source(temp.path(), "Lamp");
        let bad = source(
            temp.path(),
            "Bad",
            "package = \"org.hotrules.rules.user\"\n\n[[rule]]\nname = \"r\"\nitem = \"Lamp\"\ntrigger = \"flipped\"\n",
        );

        let outcome = NativeToolchain
            .compile(&[good, bad], &runtime_classpath(), &out)
            .unwrap();
        assert!(!outcome.succeeded());
        assert!(outcome.written.is_empty());
        assert!(!out.exists());
        assert_eq!(outcome.diagnostics[0].line, 6);
    }

    #[test]
    fn test_document_error_has_line() {
        let temp = TempDir::new().unwrap();
        let bad = source(
            temp.path(),
            "Broken",
            "package = \"org.hotrules.rules.user\"\nabstract = \"yes\"\n",
        );
        let outcome = NativeToolchain
            .compile(&[bad], &ClassPath::new(), temp.path())
            .unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].line, 2);
    }

    #[test]
    fn test_per_file_checks() {
        let temp = TempDir::new().unwrap();
        let bad = source(
            temp.path(),
            "Checks",
            r#"name = "Other"
kind = "item"

[[rule]]
name = "r"
item = "Lamp"
trigger = "received command"
to = "ON"
lt = 1
lte = 2
"#,
        );
        let outcome = NativeToolchain
            .compile(&[bad], &ClassPath::new(), temp.path())
            .unwrap();
        let messages: Vec<_> = outcome
            .diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(messages.len(), 5, "{messages:?}");
        assert!(messages.iter().any(|m| m.contains("does not match file name")));
        assert!(messages.iter().any(|m| m.contains("missing `package`")));
        assert!(messages.iter().any(|m| m.contains("without an `[item]` table")));
        assert!(messages.iter().any(|m| m.contains("only apply to `changed`")));
        assert!(messages.iter().any(|m| m.contains("`lt` and `lte`")));
    }

    #[test]
    fn test_unresolved_references() {
        let temp = TempDir::new().unwrap();
        let rule = source(
            temp.path(),
            "Refs",
            r#"package = "org.hotrules.rules.user"
extends = "org.hotrules.rules.user.Missing"

[[rule]]
name = "r"
item = "Ghost"
trigger = "changed"
"#,
        );
        let outcome = NativeToolchain
            .compile(&[rule], &runtime_classpath(), temp.path())
            .unwrap();
        let lines: Vec<_> = outcome.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, [2, 6]);
    }

    #[test]
    fn test_duplicate_identifiers() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        let text = "package = \"org.hotrules.rules.user\"\n";
        let first = source(&a, "Same", text);
        let second = source(&b, "Same", text);

        let outcome = NativeToolchain
            .compile(&[first, second], &ClassPath::new(), temp.path())
            .unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].message.contains("duplicate unit"));
    }

    #[test]
    fn test_line_of() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 99), 3);
    }
}
