//! Test: variable resolution and placeholder rendering

use crate::helpers::*;
use std::sync::Arc;

#[tokio::test]
async fn test_literal_variables_render_into_commands() {
    let yaml = r#"
name: "Test: variables"

variables:
  extra_package: "libatlas-base-dev"

steps:
  - id: "apt-install"
    name: "Install packages"
    action: apt
    op: install
    packages: ["python3-opencv", "{{ extra_package }}"]
"#;
    let mut plan = plan_from_yaml(yaml);
    let runner = Arc::new(MockRunner::new());

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert_eq!(
        runner.invoked_commands(),
        vec!["apt-get install -y python3-opencv libatlas-base-dev"]
    );
}

#[tokio::test]
async fn test_env_variable_with_default() {
    let yaml = r#"
name: "Test: env default"

variables:
  base_user:
    env: PROVISION_SCENARIO_UNSET_USER
    default: "pi"

steps:
  - id: "fix-ownership"
    name: "Fix home ownership"
    action: run
    command: "chown"
    args: ["-R", "{{ base_user }}:{{ base_user }}", "/home/{{ base_user }}"]
"#;
    let mut plan = plan_from_yaml(yaml);
    let runner = Arc::new(MockRunner::new());

    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert_eq!(
        runner.invoked_commands(),
        vec!["chown -R pi:pi /home/pi"]
    );
}

#[tokio::test]
async fn test_cli_style_override_beats_plan_variable() {
    let yaml = r#"
name: "Test: override"

variables:
  base_user: "pi"

steps:
  - id: "fix-ownership"
    name: "Fix home ownership"
    action: run
    command: "chown"
    args: ["-R", "{{ base_user }}", "/home/{{ base_user }}"]
"#;
    let mut plan = plan_from_yaml(yaml);
    plan.variables
        .insert("base_user".to_string(), "naturewatch".to_string());

    let runner = Arc::new(MockRunner::new());
    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert_eq!(
        runner.invoked_commands(),
        vec!["chown -R naturewatch /home/naturewatch"]
    );
}

#[test]
fn test_undeclared_placeholder_rejected_at_parse_time() {
    let yaml = r#"
name: "Test: undeclared"

steps:
  - id: "fix-ownership"
    name: "Fix home ownership"
    action: run
    command: "chown"
    args: ["{{ nobody_declared_this }}"]
"#;
    let result = provision::core::config::PlanConfig::from_yaml(yaml);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("nobody_declared_this"));
}
