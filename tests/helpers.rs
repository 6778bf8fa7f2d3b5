//! Test utility functions for provision

use async_trait::async_trait;
use provision::core::config::PlanConfig;
use provision::core::{Plan, RunStatus, StepState};
use provision::execution::RunEngine;
use provision::system::{
    CommandLine, CommandOutput, CommandRunner, OutputCallback, SystemError,
};
use std::sync::{Arc, Mutex};

/// Mock command runner with scripted failures
///
/// Every invocation is recorded; commands whose rendered form contains a
/// registered failure pattern exit non-zero with the scripted stderr.
pub struct MockRunner {
    failures: Vec<(String, String)>,
    invocations: Mutex<Vec<CommandLine>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            failures: Vec::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Fail any command whose display form contains `pattern`
    pub fn fail_when(mut self, pattern: &str, stderr: &str) -> Self {
        self.failures.push((pattern.to_string(), stderr.to_string()));
        self
    }

    /// All commands that reached the runner, in order
    pub fn invocations(&self) -> Vec<CommandLine> {
        self.invocations.lock().unwrap().clone()
    }

    /// Display forms of all commands that reached the runner
    pub fn invoked_commands(&self) -> Vec<String> {
        self.invocations().iter().map(|c| c.display()).collect()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run_streaming(
        &self,
        cmd: &CommandLine,
        _callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, SystemError> {
        self.invocations.lock().unwrap().push(cmd.clone());

        let display = cmd.display();
        for (pattern, stderr) in &self.failures {
            if display.contains(pattern) {
                return Err(SystemError::ExitStatus {
                    program: cmd.program.clone(),
                    code: 100,
                    stderr: stderr.clone(),
                });
            }
        }

        Ok(CommandOutput {
            stdout: format!("ran {}\n", display),
            stderr: String::new(),
        })
    }
}

/// Parse a plan from a YAML string
pub fn plan_from_yaml(yaml: &str) -> Plan {
    PlanConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse plan YAML: {}", e))
        .to_plan()
        .unwrap_or_else(|e| panic!("Failed to build plan: {}", e))
}

/// Run a plan against a mock runner
pub async fn run_plan_with_mock(
    plan: &mut Plan,
    runner: Arc<MockRunner>,
) -> PlanTestResult {
    let start = std::time::Instant::now();
    let engine = RunEngine::new(runner);
    let error = engine.execute(plan, None).await.err().map(|e| e.to_string());
    let duration = start.elapsed();

    PlanTestResult {
        plan: plan.clone(),
        error,
        duration_ms: duration.as_millis() as u64,
    }
}

/// Test result from running a plan
#[derive(Debug, Clone)]
pub struct PlanTestResult {
    pub plan: Plan,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl PlanTestResult {
    pub fn is_success(&self) -> bool {
        matches!(self.plan.state.status, RunStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.plan.state.status, RunStatus::Failed)
    }

    /// Get the output of a completed step
    pub fn get_step_output(&self, step_id: &str) -> Option<String> {
        self.plan.step(step_id).and_then(|s| match &s.state {
            StepState::Completed { output, .. } => Some(output.clone()),
            _ => None,
        })
    }

    /// Get the error message from a failed step
    pub fn get_step_error(&self, step_id: &str) -> Option<String> {
        self.plan.step(step_id).and_then(|s| match &s.state {
            StepState::Failed { error, .. } => Some(error.clone()),
            _ => None,
        })
    }

    /// Get completed step IDs in plan order
    pub fn completed_steps(&self) -> Vec<String> {
        self.plan
            .steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Completed { .. }))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Get skipped step IDs in plan order
    pub fn skipped_steps(&self) -> Vec<String> {
        self.plan
            .steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Skipped { .. }))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Get a summary of the result
    pub fn summary(&self) -> String {
        let status = match self.plan.state.status {
            RunStatus::Completed => "✅ Completed",
            RunStatus::Failed => "❌ Failed",
            RunStatus::Running => "🔄 Running",
            _ => "❓ Unknown",
        };
        format!(
            "{} - {} completed, {} failed, {} skipped, {}ms",
            status,
            self.plan.state.completed_steps,
            self.plan.state.failed_steps,
            self.plan.state.skipped_steps,
            self.duration_ms
        )
    }
}

/// Assert a step completed and check its output
pub fn assert_step_completed(result: &PlanTestResult, step_id: &str, expected_output: &str) {
    let step = result
        .plan
        .step(step_id)
        .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id));

    assert!(
        matches!(step.state, StepState::Completed { .. }),
        "Step '{}' should be completed, but was in state: {:?}",
        step_id,
        step.state
    );

    let output = result.get_step_output(step_id).unwrap();
    assert!(
        output.contains(expected_output),
        "Step '{}' output:\n{}\n\ndoes not contain:\n{}",
        step_id,
        output,
        expected_output
    );
}

/// Assert a step failed with a specific message
pub fn assert_step_failed(result: &PlanTestResult, step_id: &str, expected_error: &str) {
    let step = result
        .plan
        .step(step_id)
        .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id));

    assert!(
        matches!(step.state, StepState::Failed { .. }),
        "Step '{}' should have failed, but was in state: {:?}",
        step_id,
        step.state
    );

    let error = result.get_step_error(step_id).unwrap();
    assert!(
        error.contains(expected_error),
        "Step '{}' error:\n{}\n\ndoes not contain:\n{}",
        step_id,
        error,
        expected_error
    );
}

/// Assert a step never ran because an earlier step failed
pub fn assert_step_skipped(result: &PlanTestResult, step_id: &str) {
    let step = result
        .plan
        .step(step_id)
        .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id));

    assert!(
        matches!(step.state, StepState::Skipped { .. }),
        "Step '{}' should be skipped, but was in state: {:?}",
        step_id,
        step.state
    );
}

/// Assert the run completed successfully
pub fn assert_run_completed(result: &PlanTestResult) {
    assert!(
        result.is_success(),
        "Run should be completed, but was: {}",
        result.summary()
    );
    assert!(result.error.is_none());
}

/// Assert the run failed
pub fn assert_run_failed(result: &PlanTestResult) {
    assert!(
        result.is_failed(),
        "Run should have failed, but was: {}",
        result.summary()
    );
    assert!(result.error.is_some());
}

/// Create a minimal plan for testing
pub fn minimal_plan() -> Plan {
    let yaml = r#"
name: "Test Plan"
steps:
  - id: "update"
    name: "Refresh package index"
    action: apt
    op: update
"#;
    plan_from_yaml(yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_plan_with_mock_simple() {
        let mut plan = minimal_plan();
        let runner = Arc::new(MockRunner::new());

        let result = run_plan_with_mock(&mut plan, runner.clone()).await;

        assert_run_completed(&result);
        assert_step_completed(&result, "update", "apt-get update");
        assert_eq!(runner.invoked_commands(), vec!["apt-get update"]);
    }

    #[tokio::test]
    async fn test_mock_runner_scripted_failure() {
        let mut plan = minimal_plan();
        let runner = Arc::new(MockRunner::new().fail_when("update", "mirror unreachable"));

        let result = run_plan_with_mock(&mut plan, runner).await;

        assert_run_failed(&result);
        assert_step_failed(&result, "update", "mirror unreachable");
    }
}
