use rollcheck_common::ScenarioSettings;
use rollcheck_common::config::{EnvParser, apply_env_overrides, validate_settings};

use super::common::init_test_logging;

#[test]
fn test_file_then_env_layering() {
    init_test_logging();
    crate::test_log!("TEST START: test_file_then_env_layering");

    let mut settings = ScenarioSettings::from_toml_str(
        r#"
[target]
url = "http://staging.internal:8080"

[cluster]
namespace = "staging"
"#,
    )
    .expect("valid toml");
    apply_env_overrides(
        &mut settings,
        EnvParser::with_lookup(|name| match name {
            "ROLLCHECK_K8S_NAMESPACE" => Some("canary".to_string()),
            _ => None,
        }),
    )
    .expect("valid env");

    assert_eq!(settings.target.url, "http://staging.internal:8080");
    assert_eq!(settings.cluster.namespace, "canary");
    assert!(validate_settings(&settings).is_ok());

    crate::test_log!("TEST PASS: test_file_then_env_layering");
}

#[test]
fn test_validation_guards_command_names() {
    init_test_logging();
    crate::test_log!("TEST START: test_validation_guards_command_names");

    let mut settings = ScenarioSettings::default();
    settings.gitops.app = "app$(reboot)".to_string();
    let err = validate_settings(&settings).expect_err("app name must be rejected");
    assert!(err.to_string().contains("gitops.app"));

    crate::test_log!("TEST PASS: test_validation_guards_command_names");
}
