//! Subprocess command runner
//!
//! Spawns real processes with piped output. Both streams are read
//! line-by-line so callers can surface progress while a command runs.

use crate::system::command::{CommandLine, CommandOutput, SystemError};
use crate::system::streaming::{OutputCallback, OutputLine};
use crate::system::CommandRunner;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

/// Command runner backed by real subprocesses
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    /// Read both output streams to completion, then reap the child
    async fn drive(
        mut child: Child,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<(std::process::ExitStatus, CommandOutput), SystemError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SystemError::Internal("child stdout was not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SystemError::Internal("child stderr was not piped".to_string()))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut output = CommandOutput::default();
        let mut stdout_done = false;
        let mut stderr_done = false;

        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = stdout_lines.next_line(), if !stdout_done => match line? {
                    Some(line) => {
                        if let Some(cb) = callback {
                            cb.on_line(&OutputLine::stdout(line.clone()));
                        }
                        output.stdout.push_str(&line);
                        output.stdout.push('\n');
                    }
                    None => stdout_done = true,
                },
                line = stderr_lines.next_line(), if !stderr_done => match line? {
                    Some(line) => {
                        if let Some(cb) = callback {
                            cb.on_line(&OutputLine::stderr(line.clone()));
                        }
                        output.stderr.push_str(&line);
                        output.stderr.push('\n');
                    }
                    None => stderr_done = true,
                },
            }
        }

        let status = child.wait().await?;
        Ok((status, output))
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run_streaming(
        &self,
        cmd: &CommandLine,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, SystemError> {
        debug!("Spawning: {}", cmd.display());

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &cmd.env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|source| SystemError::Spawn {
            program: cmd.program.clone(),
            source,
        })?;

        let (status, output) = Self::drive(child, callback).await?;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(SystemError::ExitStatus {
                program: cmd.program.clone(),
                code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        debug!(
            "{} finished ({} bytes stdout)",
            cmd.program,
            output.stdout.len()
        );

        Ok(output)
    }
}
