//! Run engine
//!
//! Drives a plan strictly in list order, fail-fast: the first failed step
//! aborts the run, every later step is marked skipped, and the plan's
//! cleanup commands are run best-effort before the error is returned.

use crate::core::plan::Plan;
use crate::core::state::{RunStatus, StepState};
use crate::core::step::render_template;
use crate::execution::executor::{StepExecutor, StepOutcome};
use crate::system::{CommandLine, CommandRunner, OutputCallback};
use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Events emitted while a run progresses
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: uuid::Uuid,
        plan_name: String,
    },
    StepStarted {
        step_id: String,
        index: usize,
        total: usize,
    },
    StepCompleted {
        step_id: String,
        output: String,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    CleanupStarted,
    RunCompleted {
        run_id: uuid::Uuid,
        status: RunStatus,
    },
}

/// Handler invoked for each run event
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Executes provisioning plans
pub struct RunEngine<R: CommandRunner> {
    executor: StepExecutor<R>,
    runner: Arc<R>,
    handlers: Mutex<Vec<EventHandler>>,
}

impl<R: CommandRunner> RunEngine<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            executor: StepExecutor::new(runner.clone()),
            runner,
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler for run events
    pub fn add_event_handler(&self, handler: EventHandler) {
        self.handlers.lock().unwrap().push(handler);
    }

    fn emit(&self, event: RunEvent) {
        let handlers = self.handlers.lock().unwrap();
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Execute a plan to completion or first failure
    pub async fn execute(
        &self,
        plan: &mut Plan,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<()> {
        let total = plan.steps.len();
        plan.state.start(total);
        info!("Starting run {} for plan '{}'", plan.state.run_id, plan.name);
        self.emit(RunEvent::RunStarted {
            run_id: plan.state.run_id,
            plan_name: plan.name.clone(),
        });

        let mut failure: Option<(String, String)> = None;

        for index in 0..total {
            if let Some((failed_id, _)) = &failure {
                let reason = format!("aborted after failure of '{}'", failed_id);
                let step = &mut plan.steps[index];
                step.state = StepState::Skipped {
                    reason: reason.clone(),
                };
                self.emit(RunEvent::StepSkipped {
                    step_id: step.id.clone(),
                    reason,
                });
                continue;
            }

            let step_id = plan.steps[index].id.clone();
            let started_at = Utc::now();
            plan.steps[index].state = StepState::Running { started_at };
            self.emit(RunEvent::StepStarted {
                step_id: step_id.clone(),
                index,
                total,
            });

            let context = plan.context_for_step(&step_id);
            let outcome = self
                .executor
                .execute(&plan.steps[index], &context, callback)
                .await;

            match outcome {
                StepOutcome::Success { output } => {
                    plan.steps[index].state = StepState::Completed {
                        output: output.clone(),
                        started_at,
                        completed_at: Utc::now(),
                    };
                    self.emit(RunEvent::StepCompleted { step_id, output });
                }
                StepOutcome::Failed { error } => {
                    plan.steps[index].state = StepState::Failed {
                        error: error.clone(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    self.emit(RunEvent::StepFailed {
                        step_id: step_id.clone(),
                        error: error.clone(),
                    });
                    failure = Some((step_id, error));
                }
            }
        }

        plan.update_state_counts();

        if let Some((failed_id, error)) = failure {
            plan.state.fail();
            self.run_cleanup(plan).await;
            self.emit(RunEvent::RunCompleted {
                run_id: plan.state.run_id,
                status: plan.state.status,
            });
            bail!("step '{}' failed: {}", failed_id, error);
        }

        plan.state.complete();
        info!("Run {} completed", plan.state.run_id);
        self.emit(RunEvent::RunCompleted {
            run_id: plan.state.run_id,
            status: plan.state.status,
        });
        Ok(())
    }

    /// Run the plan's cleanup commands, ignoring their failures
    async fn run_cleanup(&self, plan: &Plan) {
        if plan.cleanup.is_empty() {
            return;
        }

        self.emit(RunEvent::CleanupStarted);
        for cleanup in &plan.cleanup {
            let cmd = match render_cleanup(&cleanup.command, &cleanup.args, plan) {
                Ok(cmd) => cmd,
                Err(e) => {
                    warn!("Skipping cleanup command '{}': {}", cleanup.command, e);
                    continue;
                }
            };

            debug!("Running cleanup: {}", cmd.display());
            if let Err(e) = self.runner.run(&cmd).await {
                warn!("Cleanup command '{}' failed: {}", cmd.display(), e);
            }
        }
    }
}

fn render_cleanup(command: &str, args: &[String], plan: &Plan) -> Result<CommandLine> {
    let mut cmd = CommandLine::new(render_template(command, &plan.variables)?);
    for arg in args {
        cmd = cmd.arg(render_template(arg, &plan.variables)?);
    }
    Ok(cmd)
}
