//! Shell runner - executes tool invocations as subprocesses

use crate::runner::{CommandRunner, RunnerError, ToolInvocation, ToolOutput};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs tool invocations on the host shell environment
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        timeout_secs: u64,
    ) -> Result<ToolOutput, RunnerError> {
        debug!("Running: {}", invocation.display_line());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        command.kill_on_drop(true);

        let timeout_duration = Duration::from_secs(timeout_secs);
        let result = timeout(timeout_duration, command.output())
            .await
            .map_err(|_| RunnerError::Timeout(timeout_secs))?;

        let output = result.map_err(|e| RunnerError::Spawn {
            program: invocation.program.clone(),
            source: e,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(
                "{} exited with code {}: {}",
                invocation.program,
                exit_code,
                stderr.trim()
            );
            return Err(RunnerError::NonZeroExit {
                program: invocation.program.clone(),
                code: exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| RunnerError::Decode {
            program: invocation.program.clone(),
            message: e.to_string(),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(
            "{} finished with {} bytes of output",
            invocation.program,
            stdout.len()
        );

        Ok(ToolOutput { stdout, stderr })
    }
}
