//! Command execution boundary.
//!
//! Every interaction with an external process (`kubectl`, `nerdctl`,
//! `curl`, `sudo`) funnels through the [`CommandRunner`] trait so the
//! orchestration pipelines can be exercised against a scripted runner in
//! tests. The host implementation shells out via `tokio::process`.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

// =============================================================================
// Command Output
// =============================================================================

/// Captured outcome of an external command.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    /// Exit code (-1 if terminated by signal).
    pub code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CmdOutput {
    /// Returns true if the command exited zero.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Standard output with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

// =============================================================================
// Runner Trait
// =============================================================================

/// Executes external commands and captures their outcome.
///
/// Implementations must not treat a non-zero exit as an `Err`: callers
/// decide whether a failure is fatal, advisory, or "not yet ready". An
/// `Err` is reserved for the command not running at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a command to completion, capturing stdout/stderr. `stdin`
    /// content, when given, is piped to the child before waiting.
    async fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<CmdOutput>;

    /// Runs a command with stdio inherited from the parent, for
    /// long-running interactive output (the image build). Only the exit
    /// code is captured.
    async fn run_streaming(&self, program: &str, args: &[String]) -> Result<i32>;
}

/// Converts a captured failure into the canonical command error.
pub fn command_error(program: &str, args: &[String], output: &CmdOutput) -> Error {
    Error::CommandFailed {
        program: program.to_string(),
        args: args.to_vec(),
        code: output.code,
        stderr: output.stderr.trim().to_string(),
    }
}

// =============================================================================
// Host Runner
// =============================================================================

/// [`CommandRunner`] backed by real host processes.
#[derive(Debug, Default)]
pub struct HostRunner;

impl HostRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for HostRunner {
    async fn run(&self, program: &str, args: &[String], stdin: Option<&str>) -> Result<CmdOutput> {
        debug!(program, ?args, "running command");

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| Error::SpawnFailed {
            program: program.to_string(),
            source,
        })?;

        if let Some(input) = stdin {
            // take() so the pipe closes before we wait, signalling EOF.
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).await?;
            }
        }

        let output = child.wait_with_output().await?;

        Ok(CmdOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_streaming(&self, program: &str, args: &[String]) -> Result<i32> {
        debug!(program, ?args, "running command (streaming)");

        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|source| Error::SpawnFailed {
                program: program.to_string(),
                source,
            })?;

        Ok(status.code().unwrap_or(-1))
    }
}

// =============================================================================
// PATH Lookup
// =============================================================================

/// Resolves a tool name against `PATH`, returning the first executable hit.
pub fn which(tool: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(tool);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_output_success() {
        let out = CmdOutput {
            code: 0,
            stdout: "  hello \n".to_string(),
            stderr: String::new(),
        };
        assert!(out.is_success());
        assert_eq!(out.stdout_trimmed(), "hello");

        let failed = CmdOutput {
            code: 1,
            stdout: String::new(),
            stderr: "boom".to_string(),
        };
        assert!(!failed.is_success());
    }

    #[test]
    fn which_finds_shell() {
        // /bin/sh exists on every unix host this tool targets.
        #[cfg(unix)]
        assert!(which("sh").is_some());
        assert!(which("definitely-not-a-real-tool-xyz").is_none());
    }

    #[tokio::test]
    async fn host_runner_captures_output() {
        let runner = HostRunner::new();
        let out = runner
            .run("sh", &["-c".to_string(), "echo hi".to_string()], None)
            .await
            .expect("spawn sh");
        assert!(out.is_success());
        assert_eq!(out.stdout_trimmed(), "hi");
    }

    #[tokio::test]
    async fn host_runner_pipes_stdin() {
        let runner = HostRunner::new();
        let out = runner
            .run("cat", &[], Some("piped"))
            .await
            .expect("spawn cat");
        assert!(out.is_success());
        assert_eq!(out.stdout_trimmed(), "piped");
    }

    #[tokio::test]
    async fn host_runner_reports_spawn_failure() {
        let runner = HostRunner::new();
        let err = runner
            .run("definitely-not-a-real-tool-xyz", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SpawnFailed { .. }));
    }
}
