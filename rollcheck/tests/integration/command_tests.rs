use std::fs;
use std::process::Command;

use crate::common::{TestDeployment, assert_contains, assert_path_exists, init_test_logging};
use crate::common::fixtures::COMPOSE;

fn rollcheck(deployment: &TestDeployment) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rollcheck"));
    cmd.current_dir(deployment.dir.path())
        .env_remove("ROLLCHECK_LOG")
        .env_remove("ROLLCHECK_URL")
        .env_remove("ROLLCHECK_HEALTH_ATTEMPTS")
        .env_remove("ROLLCHECK_COMPOSE_FILE");
    cmd
}

#[test]
fn test_rollcheck_help_describes_scenario() {
    init_test_logging();
    crate::test_log!("TEST START: test_rollcheck_help_describes_scenario");

    let output = Command::new(env!("CARGO_BIN_EXE_rollcheck"))
        .arg("--help")
        .output()
        .expect("Failed to run rollcheck --help");

    assert!(output.status.success(), "rollcheck --help failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_contains(&stdout, "roll it back");
    assert_contains(&stdout, "--extended-checks");
    assert_contains(&stdout, "--report");

    crate::test_log!("TEST PASS: test_rollcheck_help_describes_scenario");
}

#[test]
fn test_unreachable_run_fails_and_leaves_descriptor_intact() {
    init_test_logging();
    crate::test_log!("TEST START: test_unreachable_run_fails_and_leaves_descriptor_intact");

    let deployment = TestDeployment::new();
    let output = rollcheck(&deployment)
        .arg("--config")
        .arg(&deployment.config)
        .arg("--report")
        .arg(&deployment.report)
        .arg("--no-color")
        .output()
        .expect("Failed to run rollcheck");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "stdout: {stdout}");
    assert_contains(&stdout, "Result: FAILED");
    assert_contains(&stdout, "SKIP  cluster_rollback");

    assert_path_exists(&deployment.report);
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&deployment.report).unwrap()).unwrap();
    assert_eq!(report["overall_success"], false);
    // Missing tooling makes the broken deploy fail, which is the expected outcome.
    assert_eq!(report["tests"]["broken_deployment"]["success"], true);
    assert_eq!(report["tests"]["rollback"]["success"], false);
    assert_eq!(report["tests"]["cluster_rollback"]["skipped"], true);
    assert_eq!(report["tests"]["gitops_rollback"]["success"], true);
    assert!(report["tests"]["cleanup"].is_object());

    assert_eq!(fs::read_to_string(&deployment.descriptor).unwrap(), COMPOSE);
    assert!(!deployment.backup_path().exists());

    crate::test_log!("TEST PASS: test_unreachable_run_fails_and_leaves_descriptor_intact");
}

#[test]
fn test_invalid_configuration_exits_with_2() {
    init_test_logging();
    crate::test_log!("TEST START: test_invalid_configuration_exits_with_2");

    let deployment = TestDeployment::new();
    let output = rollcheck(&deployment)
        .arg("--config")
        .arg(&deployment.config)
        .arg("--url")
        .arg("localhost:5000")
        .output()
        .expect("Failed to run rollcheck");

    assert_eq!(output.status.code(), Some(2));
    assert_contains(&String::from_utf8_lossy(&output.stderr), "target.url");
    assert!(!deployment.report.exists());

    crate::test_log!("TEST PASS: test_invalid_configuration_exits_with_2");
}

#[test]
fn test_invalid_environment_exits_with_2() {
    init_test_logging();
    crate::test_log!("TEST START: test_invalid_environment_exits_with_2");

    let deployment = TestDeployment::new();
    let output = rollcheck(&deployment)
        .arg("--config")
        .arg(&deployment.config)
        .env("ROLLCHECK_HEALTH_ATTEMPTS", "many")
        .output()
        .expect("Failed to run rollcheck");

    assert_eq!(output.status.code(), Some(2));
    assert_contains(&String::from_utf8_lossy(&output.stderr), "ROLLCHECK_HEALTH_ATTEMPTS");

    crate::test_log!("TEST PASS: test_invalid_environment_exits_with_2");
}

#[test]
fn test_default_config_file_is_picked_up() {
    init_test_logging();
    crate::test_log!("TEST START: test_default_config_file_is_picked_up");

    // rollcheck.toml in the working directory is used without --config.
    let deployment = TestDeployment::new();
    let output = rollcheck(&deployment)
        .arg("--skip-cluster")
        .arg("--skip-gitops")
        .arg("--report")
        .arg(&deployment.report)
        .output()
        .expect("Failed to run rollcheck");

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&deployment.report).unwrap()).unwrap();
    let cluster = report["tests"]["cluster_rollback"]["message"].as_str().unwrap();
    assert_contains(cluster, "disabled");

    crate::test_log!("TEST PASS: test_default_config_file_is_picked_up");
}
