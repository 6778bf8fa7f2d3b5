//! Step executor
//!
//! Renders a step's action against the run context, dispatches it to the
//! matching stage, and enforces the step timeout. The executor reports
//! outcomes; it never mutates step state, the engine owns that.

use crate::core::context::RunContext;
use crate::core::step::{Action, Step};
use crate::stages::{overlay, packages, python, services};
use crate::system::{CommandLine, CommandRunner, OutputCallback, SystemError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of executing a single step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Step finished successfully
    Success { output: String },
    /// Step failed, aborting the run
    Failed { error: String },
}

/// Executes individual steps against the host
pub struct StepExecutor<R: CommandRunner> {
    runner: Arc<R>,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Execute one step to completion or failure
    pub async fn execute(
        &self,
        step: &Step,
        context: &RunContext,
        callback: Option<&dyn OutputCallback>,
    ) -> StepOutcome {
        debug!("Executing step '{}' ({})", step.id, step.action.kind());

        let action = match step.action.render(&context.rendering_variables()) {
            Ok(action) => action,
            Err(e) => {
                return StepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let timeout = Duration::from_secs(step.timeout_secs);
        match tokio::time::timeout(timeout, self.dispatch(&action, callback)).await {
            Ok(Ok(output)) => StepOutcome::Success { output },
            Ok(Err(error)) => StepOutcome::Failed {
                error: error.to_string(),
            },
            Err(_) => StepOutcome::Failed {
                error: SystemError::Timeout(step.timeout_secs).to_string(),
            },
        }
    }

    async fn dispatch(
        &self,
        action: &Action,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<String, SystemError> {
        match action {
            Action::UnpackOverlay { source, dest, owner } => {
                let stats = overlay::unpack(
                    std::path::Path::new(source),
                    std::path::Path::new(dest),
                    owner.as_deref(),
                )?;
                Ok(format!(
                    "unpacked {} files, {} dirs into {}",
                    stats.files, stats.dirs, dest
                ))
            }
            Action::Apt { op, packages } => {
                let output = packages::run(self.runner.as_ref(), *op, packages, callback).await?;
                Ok(output.stdout)
            }
            Action::PipInstall {
                requirements,
                python,
            } => {
                let output = python::run(
                    self.runner.as_ref(),
                    requirements,
                    python.as_deref(),
                    callback,
                )
                .await?;
                Ok(output.stdout)
            }
            Action::InstallService {
                unit,
                service_dir,
                enable,
            } => {
                let installed = services::install(
                    self.runner.as_ref(),
                    unit,
                    service_dir.as_deref(),
                    *enable,
                    callback,
                )
                .await?;
                Ok(format!("installed {}", installed.display()))
            }
            Action::Run { command, args } => {
                let cmd = CommandLine::new(command.clone()).args(args.iter().cloned());
                let output = self.runner.run_streaming(&cmd, callback).await?;
                Ok(output.stdout)
            }
        }
    }
}
