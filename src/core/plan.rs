//! Plan domain model

use crate::core::{
    config::{CleanupConfig, PlanConfig},
    context::RunContext,
    state::{RunState, RunStatus, StepState},
    step::{Step, StepDefaults},
};
use anyhow::Result;
use std::collections::HashMap;

/// A provisioning plan: an ordered sequence of steps plus run state
///
/// Steps have no dependency graph; execution order is list order.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Plan name
    pub name: String,

    /// Resolved variables available to all steps
    pub variables: HashMap<String, String>,

    /// Steps in execution order
    pub steps: Vec<Step>,

    /// Cleanup commands run best-effort on failure
    pub cleanup: Vec<CleanupConfig>,

    /// Run state
    pub state: RunState,
}

impl Plan {
    /// Create a plan from configuration, resolving environment variables
    pub fn from_config(config: &PlanConfig) -> Result<Self> {
        let defaults = StepDefaults {
            timeout_secs: config
                .default_timeout_secs
                .unwrap_or_else(|| StepDefaults::default().timeout_secs),
        };

        let steps = config
            .steps
            .iter()
            .map(|step_config| Step::from_config(step_config, &defaults))
            .collect();

        Ok(Plan {
            name: config.name.clone(),
            variables: config.resolve_variables()?,
            steps,
            cleanup: config.cleanup.clone(),
            state: RunState::new(),
        })
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get a mutable step by ID
    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Check if all steps are in terminal states
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if the run has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == RunStatus::Failed
    }

    /// Steps that completed successfully, in plan order
    pub fn completed_steps(&self) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Completed { .. }))
            .collect()
    }

    /// Steps that are not safe to re-apply to an already-provisioned image
    pub fn non_idempotent_steps(&self) -> Vec<&Step> {
        self.steps.iter().filter(|s| !s.idempotent).collect()
    }

    /// Create the execution context for a step
    pub fn context_for_step(&self, step_id: &str) -> RunContext {
        let mut context = RunContext::new();
        context.variables.extend(self.variables.clone());
        context.current_step_id = Some(step_id.to_string());
        context
    }

    /// Recompute the run state counts from step states
    pub fn update_state_counts(&mut self) {
        let mut completed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for step in &self.steps {
            match &step.state {
                StepState::Completed { .. } => completed += 1,
                StepState::Failed { .. } => failed += 1,
                StepState::Skipped { .. } => skipped += 1,
                _ => {}
            }
        }

        self.state.update_counts(completed, failed, skipped);
    }
}
