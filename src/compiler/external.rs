//! Out-of-process toolchain.
//!
//! Invoked as
//! `<command...> --classpath <cp> --out <dir> <sources...>`; diagnostics are
//! read from stderr and stdout in `file:line[:col]: message` form.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::toolchain::{CompileError, CompileOutcome, Diagnostic, Toolchain};
use crate::debug;
use crate::loader::ClassPath;
use crate::unit::{SourceUnit, artifact_path_for};
use crate::utils::exec::{Cmd, strip_ansi};

#[derive(Debug, Clone)]
pub struct ExternalToolchain {
    program: PathBuf,
    args: Vec<String>,
    display: String,
}

impl ExternalToolchain {
    /// Resolve `command[0]` through `PATH`.
    pub fn new(command: &[String]) -> Result<Self, CompileError> {
        let (program, args) = command.split_first().ok_or(CompileError::EmptyCommand)?;
        let resolved =
            which::which(program).map_err(|e| CompileError::NotFound(program.clone(), e))?;
        Ok(Self {
            program: resolved,
            args: args.to_vec(),
            display: program.clone(),
        })
    }
}

fn diagnostic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<file>[^:\s][^:]*):(?P<line>\d+)(?::\d+)?:\s*(?:error:\s*)?(?P<msg>.+)$")
            .expect("valid diagnostic regex")
    })
}

/// Pick `file:line[:col]: message` lines out of toolchain output.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    let re = diagnostic_regex();
    output
        .lines()
        .filter_map(|line| {
            let line = strip_ansi(line);
            let caps = re.captures(line.trim())?;
            Some(Diagnostic::new(
                caps["file"].trim(),
                caps["line"].parse().unwrap_or(0),
                caps["msg"].trim(),
            ))
        })
        .collect()
}

impl Toolchain for ExternalToolchain {
    fn name(&self) -> &str {
        &self.display
    }

    fn compile(
        &self,
        sources: &[SourceUnit],
        classpath: &ClassPath,
        output_root: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        std::fs::create_dir_all(output_root)
            .map_err(|e| CompileError::Output(output_root.to_path_buf(), e))?;

        let cmd = Cmd::new(&self.program)
            .args(&self.args)
            .arg("--classpath")
            .arg(classpath.to_arg())
            .arg("--out")
            .arg(output_root)
            .args(sources.iter().map(|s| &s.path));
        debug!("compile"; "running {} on {} sources", self.display, sources.len());

        let output = cmd.output().map_err(CompileError::Spawn)?;
        let mut outcome = CompileOutcome {
            sources: sources.len(),
            ..CompileOutcome::default()
        };

        if output.status.success() {
            outcome.written = sources
                .iter()
                .map(|s| artifact_path_for(output_root, &s.identifier))
                .filter(|p| p.is_file())
                .collect();
            return Ok(outcome);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        outcome.diagnostics = parse_diagnostics(&stderr);
        outcome.diagnostics.extend(parse_diagnostics(&stdout));

        if outcome.diagnostics.is_empty() {
            let last = stderr
                .lines()
                .chain(stdout.lines())
                .map(str::trim)
                .rfind(|l| !l.is_empty())
                .unwrap_or("no output");
            outcome.diagnostics.push(Diagnostic::new(
                &self.program,
                0,
                format!("{} ({last})", output.status),
            ));
        }
        Ok(outcome)
    }
}
