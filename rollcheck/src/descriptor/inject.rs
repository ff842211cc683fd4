//! Failure injection: write a well-formed but undeployable descriptor.

use serde_yaml_ng::{Mapping, Value};
use tracing::{debug, info};

use super::{ConfigBackup, ConfigError, atomic_write};

/// Build file every rewritten service points at. It must not exist.
pub const BROKEN_DOCKERFILE: &str = "Dockerfile.rollcheck-broken";

/// Environment entry appended to every rewritten service.
pub const INVALID_ENV_ENTRY: &str = "INVALID_ENV_VAR=broken_value";

/// Written when the original descriptor has no services to rewrite.
const BROKEN_TEMPLATE: &str = r#"services:
  app:
    build:
      context: .
      dockerfile: Dockerfile.rollcheck-broken
    ports:
      - "5000:5000"
    environment:
      - FLASK_ENV=development
      - INVALID_ENV_VAR=broken_value
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectMode {
    /// The original services were kept and their builds broken.
    Rewritten { services: usize },
    /// The fixed broken template replaced the descriptor.
    Template,
}

fn broken_build() -> Value {
    let mut build = Mapping::new();
    build.insert(Value::from("context"), Value::from("."));
    build.insert(Value::from("dockerfile"), Value::from(BROKEN_DOCKERFILE));
    Value::Mapping(build)
}

fn break_service(service: &mut Mapping) {
    service.insert(Value::from("build"), broken_build());

    if !matches!(
        service.get("environment"),
        Some(Value::Sequence(_) | Value::Mapping(_))
    ) {
        service.insert(Value::from("environment"), Value::Sequence(Vec::new()));
    }
    match service.get_mut("environment") {
        Some(Value::Sequence(entries)) => entries.push(Value::from(INVALID_ENV_ENTRY)),
        Some(Value::Mapping(entries)) => {
            if let Some((key, value)) = INVALID_ENV_ENTRY.split_once('=') {
                entries.insert(Value::from(key), Value::from(value));
            }
        }
        _ => {}
    }
}

/// Break every service of a parsed compose document; returns how many.
fn break_services(doc: &mut Value) -> usize {
    let Some(services) = doc.get_mut("services").and_then(Value::as_mapping_mut) else {
        return 0;
    };
    let mut broken = 0;
    for (_, service) in services.iter_mut() {
        if let Some(service) = service.as_mapping_mut() {
            break_service(service);
            broken += 1;
        }
    }
    broken
}

/// Overwrite the descriptor with a broken variant of its backed-up content.
///
/// A backup must already be held; the pristine text is read from it so a
/// second injection never compounds the first.
pub fn inject(backup: &ConfigBackup) -> Result<InjectMode, ConfigError> {
    let pristine = backup.read_backup()?;

    let (content, mode) = match serde_yaml_ng::from_str::<Value>(&pristine) {
        Ok(mut doc) => match break_services(&mut doc) {
            0 => (BROKEN_TEMPLATE.to_string(), InjectMode::Template),
            services => (
                serde_yaml_ng::to_string(&doc).map_err(|e| ConfigError::Render(e.to_string()))?,
                InjectMode::Rewritten { services },
            ),
        },
        Err(e) => {
            debug!(error = %e, "Descriptor is not YAML, using broken template");
            (BROKEN_TEMPLATE.to_string(), InjectMode::Template)
        }
    };

    let path = backup.original_path();
    atomic_write(path, content.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(descriptor = %path.display(), mode = ?mode, "Broken descriptor written");
    Ok(mode)
}
