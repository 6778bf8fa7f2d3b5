//! Test: full apt chain executes in plan order

use crate::helpers::*;
use std::sync::Arc;

#[tokio::test]
async fn test_apt_chain_runs_in_order() {
    let yaml = r#"
name: "Test: apt chain"

steps:
  - id: "purge-wolfram"
    name: "Remove wolfram-engine"
    action: apt
    op: purge
    packages: ["wolfram-engine"]

  - id: "apt-update"
    name: "Refresh package index"
    action: apt
    op: update

  - id: "apt-upgrade"
    name: "Upgrade packages"
    action: apt
    op: upgrade

  - id: "apt-install"
    name: "Install camera dependencies"
    action: apt
    op: install
    packages: ["python3-opencv", "python3-picamera2", "git"]
"#;
    let mut plan = plan_from_yaml(yaml);
    let runner = Arc::new(MockRunner::new());

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert_eq!(
        result.completed_steps(),
        vec!["purge-wolfram", "apt-update", "apt-upgrade", "apt-install"]
    );
    assert_eq!(
        runner.invoked_commands(),
        vec![
            "apt-get purge -y wolfram-engine",
            "apt-get update",
            "apt-get upgrade -y",
            "apt-get install -y python3-opencv python3-picamera2 git",
        ]
    );
    assert_eq!(result.skipped_steps().len(), 0);
}

#[tokio::test]
async fn test_run_steps_pass_arguments_through() {
    let yaml = r#"
name: "Test: run action"

steps:
  - id: "enable-camera"
    name: "Enable the camera interface"
    action: run
    command: "raspi-config"
    args: ["nonint", "do_camera", "0"]
"#;
    let mut plan = plan_from_yaml(yaml);
    let runner = Arc::new(MockRunner::new());

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert_eq!(
        runner.invoked_commands(),
        vec!["raspi-config nonint do_camera 0"]
    );

    // run steps are not idempotent by default
    assert!(!plan.step("enable-camera").unwrap().idempotent);
}
