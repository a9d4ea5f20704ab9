//! Configuration loading from `planning.toml` files.

mod support;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use academic_planning::db::{
    warm_up, LocalRepository, PlanningConfig, RepositoryError, RepositoryFactory,
};
use academic_planning::models::{AssistantId, EmploymentCategory, StaffKey, TeacherId};
use academic_planning::services::StaffDirectory;
use support::*;
use tempfile::TempDir;

const SAMPLE: &str = r#"
[coordinator]
lock_timeout_ms = 100

[repository]
type = "local"

[[staff]]
kind = "teacher"
id = 1
category = "full_time"
max_hours = 20

[[staff]]
kind = "teacher"
id = 2
category = "adjunct"
max_hours = 8

[[staff]]
kind = "teaching_assistant"
id = 1
category = "teaching_assistant"
max_hours = 6
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("planning.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, SAMPLE);

    let config = PlanningConfig::from_file(&path).unwrap();
    assert_eq!(config.staff.len(), 3);
    assert_eq!(
        config.coordinator_settings().lock_timeout,
        Duration::from_millis(100)
    );

    let directory = config.directory().unwrap();
    let adjunct = directory.profile(StaffKey::Teacher(TeacherId(2))).unwrap();
    assert_eq!(adjunct.category, EmploymentCategory::Adjunct);
    assert_eq!(adjunct.max_hours, 8);
    assert!(directory
        .profile(StaffKey::TeachingAssistant(AssistantId(1)))
        .is_some());
    assert!(directory.profile(StaffKey::Teacher(TeacherId(3))).is_none());
}

#[test]
fn test_missing_file_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let err = PlanningConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    match err {
        RepositoryError::ConfigurationError { message, context } => {
            assert!(message.contains("Failed to read config file"));
            assert_eq!(context.operation.as_deref(), Some("from_file"));
        }
        other => panic!("expected ConfigurationError, got {other:?}"),
    }
}

#[test]
fn test_malformed_file_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[[staff]]\nkind = \"teacher\"\nid = \"one\"\n");
    let err = PlanningConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, RepositoryError::ConfigurationError { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn test_factory_loads_snapshot_named_in_config() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshot.json");
    LocalRepository::new().save_to_file(&snapshot).unwrap();

    let content = format!(
        "[repository]\ntype = \"local\"\nsnapshot_path = {:?}\n",
        snapshot.display().to_string()
    );
    let path = write_config(&dir, &content);

    let config = PlanningConfig::from_file(&path).unwrap();
    assert_eq!(config.repository.snapshot_path.as_deref(), Some(snapshot.as_path()));
    assert!(RepositoryFactory::from_config_file(&path).is_ok());
}

#[test]
fn test_factory_rejects_corrupt_snapshot() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshot.json");
    fs::write(&snapshot, "{ not json").unwrap();

    let err = RepositoryFactory::create_local_from_snapshot(&snapshot).err().expect("expected error for corrupt snapshot");
    assert!(matches!(err, RepositoryError::SerializationError { .. }));
    assert_eq!(
        err.context().operation.as_deref(),
        Some("create_local_from_snapshot")
    );
}

#[tokio::test]
async fn test_configured_coordinator_enforces_budgets() {
    let config: PlanningConfig = SAMPLE.parse().unwrap();
    let repo = RepositoryFactory::from_config(&config).unwrap();
    let coordinator = warm_up(
        repo.as_ref(),
        Arc::new(config.directory().unwrap()),
        config.coordinator_settings(),
    )
    .await
    .unwrap();

    // Teacher 2 is an adjunct with an 8 hour budget.
    let err = coordinator
        .allocate(&request(vec![monday(1, 101, 2, (8, 0), (17, 0))]))
        .unwrap_err();
    assert_eq!(err.kind().as_str(), "workload_exceeded");

    // Teacher 1 has 20 hours.
    assert!(coordinator
        .allocate(&request(vec![monday(2, 101, 1, (8, 0), (17, 0))]))
        .is_ok());
}
