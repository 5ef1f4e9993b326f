//! Subprocess runner for the external tools driven by the pipeline

pub mod shell;
pub mod tools;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

pub use shell::ShellRunner;

/// Error types for tool invocations
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Failed to decode {program} output: {message}")]
    Decode { program: String, message: String },
}

/// A single external-tool invocation, treated as a black box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Executable name or path
    pub program: String,

    /// Command-line arguments
    pub args: Vec<String>,

    /// Extra environment variables for the child process
    pub env: Vec<(String, String)>,

    /// Working directory; inherits the runner's when absent
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// One-line rendering for logs and error messages
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured output of a finished tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Trait for running tool invocations - allows scripted test doubles
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run an invocation to completion, enforcing the given timeout
    async fn run(
        &self,
        invocation: &ToolInvocation,
        timeout_secs: u64,
    ) -> Result<ToolOutput, RunnerError>;
}
