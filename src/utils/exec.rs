//! External command execution utilities.
//!
//! Provides a Builder-based API for running external tools (the bundler)
//! with captured output and readable failures.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! Cmd::from_slice(&["esbuild"])
//!     .arg(entry)
//!     .args(["--bundle", "--minify"])
//!     .cwd(input_dir)
//!     .run()?;
//! ```

use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, Output},
};

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["esbuild"]` or `["npx", "esbuild"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Arguments as passed to the process.
    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Execute the command and return its output.
    ///
    /// A non-zero exit status is an error carrying the captured stderr.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();
        if self.program.is_empty() {
            bail!("empty command");
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        crate::debug!("exec"; "{} {}", name, self.args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" "));

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        if !output.status.success() {
            bail!(format_error(&name, &output));
        }

        Ok(output)
    }
}

/// Build an error message from a failed process output.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };

    match output.status.code() {
        Some(code) if detail.is_empty() => format!("`{name}` exited with status {code}"),
        Some(code) => format!("`{name}` exited with status {code}:\n{detail}"),
        None if detail.is_empty() => format!("`{name}` was terminated by a signal"),
        None => format!("`{name}` was terminated by a signal:\n{detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_splits_program() {
        let cmd = Cmd::from_slice(&["npx", "esbuild"]).arg("--bundle").arg("");
        assert_eq!(cmd.program_name(), "npx");
        assert_eq!(cmd.arg_list(), &[OsString::from("esbuild"), OsString::from("--bundle")]);
    }

    #[test]
    fn test_empty_command_fails() {
        let empty: [&str; 0] = [];
        assert!(Cmd::from_slice(&empty).run().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_stderr() {
        let err = Cmd::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("status 3"));
        assert!(msg.contains("broken"));
    }
}
