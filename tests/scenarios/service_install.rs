//! Test: service installation steps

use crate::helpers::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "provision-scenario-svc-{}-{}",
        label,
        uuid::Uuid::new_v4()
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[tokio::test]
async fn test_service_step_moves_unit_and_enables_it() {
    let staging = temp_dir("staging");
    let service_dir = temp_dir("systemd");
    let unit = staging.join("python.naturewatch.service");
    fs::write(&unit, "[Unit]\nDescription=NaturewatchCameraServer\n").unwrap();

    let yaml = format!(
        r#"
name: "Test: service install"

variables:
  staging: "{}"
  service_dir: "{}"

steps:
  - id: "install-camera-service"
    name: "Install the camera service"
    action: install-service
    unit: "{{{{ staging }}}}/python.naturewatch.service"
    service_dir: "{{{{ service_dir }}}}"
"#,
        staging.display(),
        service_dir.display()
    );

    let mut plan = plan_from_yaml(&yaml);
    let runner = Arc::new(MockRunner::new());
    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert!(service_dir.join("python.naturewatch.service").is_file());
    assert!(!unit.exists());
    assert_eq!(
        runner.invoked_commands(),
        vec!["systemctl enable python.naturewatch.service"]
    );

    fs::remove_dir_all(&staging).ok();
    fs::remove_dir_all(&service_dir).ok();
}

#[tokio::test]
async fn test_service_step_with_enable_false() {
    let staging = temp_dir("staging");
    let service_dir = temp_dir("systemd");
    let unit = staging.join("wifisetup.service");
    fs::write(&unit, "[Unit]\n").unwrap();

    let yaml = format!(
        r#"
name: "Test: service no enable"

variables:
  staging: "{}"
  service_dir: "{}"

steps:
  - id: "install-wifi-service"
    name: "Install the wifi setup service"
    action: install-service
    unit: "{{{{ staging }}}}/wifisetup.service"
    service_dir: "{{{{ service_dir }}}}"
    enable: false
"#,
        staging.display(),
        service_dir.display()
    );

    let mut plan = plan_from_yaml(&yaml);
    let runner = Arc::new(MockRunner::new());
    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_completed(&result);
    assert!(service_dir.join("wifisetup.service").is_file());
    assert!(runner.invocations().is_empty());

    fs::remove_dir_all(&staging).ok();
    fs::remove_dir_all(&service_dir).ok();
}

#[tokio::test]
async fn test_missing_unit_file_fails_the_run() {
    let service_dir = temp_dir("systemd");

    let yaml = format!(
        r#"
name: "Test: missing unit"

variables:
  service_dir: "{}"

steps:
  - id: "install-camera-service"
    name: "Install the camera service"
    action: install-service
    unit: "/tmp/provision-scenario-no-such.service"
    service_dir: "{{{{ service_dir }}}}"
"#,
        service_dir.display()
    );

    let mut plan = plan_from_yaml(&yaml);
    let runner = Arc::new(MockRunner::new());
    let result = run_plan_with_mock(&mut plan, runner.clone()).await;

    assert_run_failed(&result);
    assert_step_failed(&result, "install-camera-service", "does not exist");
    assert!(runner.invocations().is_empty());

    fs::remove_dir_all(&service_dir).ok();
}
