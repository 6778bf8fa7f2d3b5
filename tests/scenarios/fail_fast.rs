//! Test: first failure aborts the run and triggers cleanup

use crate::helpers::*;
use std::sync::Arc;

const PLAN: &str = r#"
name: "Test: fail fast"

variables:
  base_user: "pi"

steps:
  - id: "apt-update"
    name: "Refresh package index"
    action: apt
    op: update

  - id: "apt-install"
    name: "Install camera dependencies"
    action: apt
    op: install
    packages: ["python3-opencv"]

  - id: "enable-camera"
    name: "Enable the camera interface"
    action: run
    command: "raspi-config"
    args: ["nonint", "do_camera", "0"]

cleanup:
  - command: "rm"
    args: ["-f", "/home/{{ base_user }}/.provision-staging"]
"#;

#[tokio::test]
async fn test_failed_step_skips_the_rest() {
    let mut plan = plan_from_yaml(PLAN);
    let runner = Arc::new(MockRunner::new().fail_when("install", "Unable to locate package"));

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_failed(&result);
    assert_step_completed(&result, "apt-update", "apt-get update");
    assert_step_failed(&result, "apt-install", "Unable to locate package");
    assert_step_skipped(&result, "enable-camera");

    // The skipped step's command never reached the runner
    let commands = runner.invoked_commands();
    assert!(!commands.iter().any(|c| c.contains("raspi-config")));

    // The engine's error names the failing step
    assert!(result.error.as_ref().unwrap().contains("apt-install"));
}

#[tokio::test]
async fn test_cleanup_runs_after_failure_with_variables_rendered() {
    let mut plan = plan_from_yaml(PLAN);
    let runner = Arc::new(MockRunner::new().fail_when("install", "boom"));

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_failed(&result);
    let commands = runner.invoked_commands();
    assert_eq!(
        commands.last().unwrap(),
        "rm -f /home/pi/.provision-staging"
    );
}

#[tokio::test]
async fn test_cleanup_failure_does_not_mask_step_error() {
    let mut plan = plan_from_yaml(PLAN);
    let runner = Arc::new(
        MockRunner::new()
            .fail_when("install", "Unable to locate package")
            .fail_when("rm -f", "permission denied"),
    );

    let result = run_plan_with_mock(&mut plan, runner).await;

    assert_run_failed(&result);
    let error = result.error.unwrap();
    assert!(error.contains("apt-install"));
    assert!(!error.contains("permission denied"));
}

#[tokio::test]
async fn test_cleanup_does_not_run_on_success() {
    let mut plan = plan_from_yaml(PLAN);
    let runner = Arc::new(MockRunner::new());

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    let commands = runner.invoked_commands();
    assert!(!commands.iter().any(|c| c.starts_with("rm")));
}

#[tokio::test]
async fn test_first_step_failing_skips_everything_else() {
    let mut plan = plan_from_yaml(PLAN);
    let runner = Arc::new(MockRunner::new().fail_when("update", "mirror unreachable"));

    let result = run_plan_with_mock(&mut plan, runner).await;

    assert_run_failed(&result);
    assert_step_failed(&result, "apt-update", "mirror unreachable");
    assert_eq!(
        result.skipped_steps(),
        vec!["apt-install", "enable-camera"]
    );
    assert_eq!(result.plan.state.completed_steps, 0);
    assert_eq!(result.plan.state.skipped_steps, 2);
}
