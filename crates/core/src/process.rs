//! External Processes
//!
//! The narrow capability used to launch the native build tool and the
//! toolchain generator, plus a recording implementation for dry runs.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status of an external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    pub const SUCCESS: CommandStatus = CommandStatus { code: Some(0) };

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Runs external commands to completion
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> impl Future<Output = io::Result<CommandStatus>> + Send;
}

/// Spawns real processes with tokio, streaming output to the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandStatus> {
        let program = which::which(&spec.program).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("`{}` not found: {}", spec.program, e),
            )
        })?;

        debug!("Running: {}", spec);

        let mut cmd = Command::new(program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(ref cwd) = spec.cwd {
            cmd.current_dir(cwd);
        }

        let status = cmd.status().await?;
        Ok(CommandStatus { code: status.code() })
    }
}

type FailurePredicate = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;

/// Records commands instead of running them.
///
/// Used for `--dry-run` and wherever processes must not be spawned.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_when: Option<FailurePredicate>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report exit code 1 for commands matching the predicate
    pub fn failing_when<F>(predicate: F) -> Self
    where
        F: Fn(&CommandSpec) -> bool + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_when: Some(Box::new(predicate)),
        }
    }

    /// Commands seen so far, in call order
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }
}

impl fmt::Debug for RecordingRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingRunner")
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandStatus> {
        info!("[dry-run] {}", spec);
        self.calls.lock().push(spec.clone());

        let failed = self.fail_when.as_ref().map(|f| f(spec)).unwrap_or(false);
        Ok(if failed {
            CommandStatus { code: Some(1) }
        } else {
            CommandStatus::SUCCESS
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let spec = CommandSpec::new("cargo").args(["build", "--release"]).env("CC", "clang");
        assert_eq!(spec.to_string(), "cargo build --release");
        assert_eq!(spec.env["CC"], "clang");
    }

    #[tokio::test]
    async fn test_recording_runner() {
        let runner = RecordingRunner::failing_when(|spec| spec.args.iter().any(|a| a == "--target=x86"));

        let ok = runner.run(&CommandSpec::new("cargo").arg("build")).await.unwrap();
        let failed = runner
            .run(&CommandSpec::new("cargo").args(["build", "--target=x86"]))
            .await
            .unwrap();

        assert!(ok.success());
        assert!(!failed.success());
        assert_eq!(failed.to_string(), "exit code 1");
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let err = TokioCommandRunner
            .run(&CommandSpec::new("crossndk-definitely-missing-program"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
