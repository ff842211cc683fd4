use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use tempfile::TempDir;

pub const COMPOSE: &str = r#"services:
  app:
    build: .
    ports:
      - "5000:5000"
    environment:
      - FLASK_ENV=production
"#;

/// A deployment directory whose tools do not exist and whose target is down.
pub struct TestDeployment {
    pub dir: TempDir,
    pub descriptor: PathBuf,
    pub config: PathBuf,
    pub report: PathBuf,
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe port");
    listener.local_addr().expect("Failed to read probe port").port()
}

impl TestDeployment {
    pub fn new() -> Self {
        crate::test_log!("FIXTURE: Creating unreachable test deployment");

        let dir = TempDir::new().expect("Failed to create temp dir");
        let descriptor = dir.path().join("docker-compose.test.yml");
        let config = dir.path().join("rollcheck.toml");
        let report = dir.path().join("report.json");

        fs::write(&descriptor, COMPOSE).expect("Failed to write descriptor");
        fs::write(
            &config,
            format!(
                r#"[target]
url = "http://127.0.0.1:{port}"
probe_timeout_secs = 1
check_timeout_secs = 1

[health]
max_attempts = 1
delay_ms = 0

[timing]
command_timeout_secs = 10
cold_start_wait_secs = 0
recovery_settle_secs = 0

[compose]
program = "rollcheck-missing-compose"
descriptor = "{descriptor}"

[cluster]
program = "rollcheck-missing-kubectl"

[gitops]
program = "rollcheck-missing-argocd"
"#,
                port = closed_port(),
                descriptor = descriptor.display(),
            ),
        )
        .expect("Failed to write rollcheck.toml");

        Self {
            dir,
            descriptor,
            config,
            report,
        }
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.path().join("docker-compose.test.yml.backup")
    }
}
