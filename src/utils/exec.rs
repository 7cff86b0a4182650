//! External command execution.
//!
//! ```ignore
//! let output = Cmd::new("rulec")
//!     .args(["--out", "classes"])
//!     .output()?;
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    process::{Command, Output},
    sync::OnceLock,
};

/// Command builder for an external toolchain.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add one argument; empty ones are skipped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.push(arg.as_ref());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.push(arg.as_ref());
        }
        self
    }

    fn push(&mut self, arg: &OsStr) {
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
    }

    /// Execute and return output regardless of exit status.
    ///
    /// Compilers report diagnostics through a failing exit status, so
    /// the caller decides what a non-zero status means.
    pub fn output(self) -> Result<Output> {
        Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("Failed to execute `{}`", self.program.to_string_lossy()))
    }
}

/// Strip ANSI escape codes from string.
pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi regex"));
    re.replace_all(s, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_args_skipped() {
        let cmd = Cmd::new("rulec")
            .arg("")
            .arg("--out")
            .args(["classes", "", "Lamp.rule"]);
        assert_eq!(cmd.program, OsString::from("rulec"));
        assert_eq!(cmd.args.len(), 3);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_keeps_failing_status() {
        let output = Cmd::new("sh")
            .args(["-c", "echo oops >&2; exit 3"])
            .output()
            .unwrap();
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("oops"));
    }
}
