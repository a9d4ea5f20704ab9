//! Planning configuration file support.
//!
//! Reads coordinator settings, the repository selection and staff budgets
//! from a TOML file:
//!
//! ```toml
//! [coordinator]
//! lock_timeout_ms = 250
//!
//! [repository]
//! type = "local"
//! snapshot_path = "planning-snapshot.json"
//!
//! [[staff]]
//! kind = "teacher"
//! id = 1
//! category = "full_time"
//! max_hours = 20
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::factory::RepositoryType;
use super::repository::{ErrorContext, RepositoryError};
use crate::models::{AssistantId, EmploymentCategory, ResourceKind, StaffKey, TeacherId};
use crate::services::{ConfiguredDirectory, CoordinatorSettings, StaffProfile};

/// Planning configuration from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub staff: Vec<StaffConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Repository type settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(rename = "type", default = "default_repo_type")]
    pub repo_type: String,
    /// JSON snapshot the local repository is loaded from, if present.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repo_type: default_repo_type(),
            snapshot_path: None,
        }
    }
}

/// One `[[staff]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffConfig {
    pub kind: ResourceKind,
    pub id: i64,
    pub category: EmploymentCategory,
    pub max_hours: u32,
}

impl StaffConfig {
    pub fn staff_key(&self) -> Result<StaffKey, RepositoryError> {
        match self.kind {
            ResourceKind::Teacher => Ok(StaffKey::Teacher(TeacherId(self.id))),
            ResourceKind::TeachingAssistant => Ok(StaffKey::TeachingAssistant(AssistantId(self.id))),
            ResourceKind::Classroom => Err(RepositoryError::configuration_with_context(
                "Staff entries must be teachers or teaching assistants",
                ErrorContext::new("load_staff")
                    .with_entity("classroom")
                    .with_entity_id(self.id),
            )),
        }
    }

    pub fn profile(&self) -> StaffProfile {
        StaffProfile {
            category: self.category,
            max_hours: self.max_hours,
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    250
}

fn default_repo_type() -> String {
    "local".to_string()
}

impl FromStr for PlanningConfig {
    type Err = RepositoryError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })
    }
}

impl PlanningConfig {
    /// Load planning configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PlanningConfig)` if successful
    /// * `Err(RepositoryError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration_with_context(
                format!("Failed to read config file: {}", e),
                ErrorContext::new("from_file").with_details(path.as_ref().display().to_string()),
            )
        })?;

        content.parse()
    }

    /// Load planning configuration from the default location.
    ///
    /// Searches for `planning.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        let search_paths = [
            PathBuf::from("planning.toml"),
            PathBuf::from("backend/planning.toml"),
            PathBuf::from("../planning.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(RepositoryError::configuration(
            "No planning.toml found in standard locations",
        ))
    }

    /// Get the repository type from configuration.
    pub fn repository_type(&self) -> Result<RepositoryType, RepositoryError> {
        RepositoryType::from_str(&self.repository.repo_type).map_err(|e| {
            RepositoryError::configuration(format!("Invalid repository type: {}", e))
        })
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            lock_timeout: Duration::from_millis(self.coordinator.lock_timeout_ms),
        }
    }

    /// Build the staff directory from the `[[staff]]` entries.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ConfigurationError)` for classroom entries or
    ///   a staff member listed twice
    pub fn directory(&self) -> Result<ConfiguredDirectory, RepositoryError> {
        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(self.staff.len());
        for entry in &self.staff {
            let key = entry.staff_key()?;
            if !seen.insert(key) {
                return Err(RepositoryError::configuration_with_context(
                    "Staff member configured twice",
                    ErrorContext::new("load_staff").with_entity_id(key),
                ));
            }
            profiles.push((key, entry.profile()));
        }
        Ok(profiles.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StaffDirectory;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[coordinator]
lock_timeout_ms = 500

[repository]
type = "local"

[[staff]]
kind = "teacher"
id = 1
category = "full_time"
max_hours = 20

[[staff]]
kind = "teaching_assistant"
id = 7
category = "teaching_assistant"
max_hours = 10
"#;

        let config: PlanningConfig = toml.parse().unwrap();
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
        assert_eq!(
            config.coordinator_settings().lock_timeout,
            Duration::from_millis(500)
        );

        let directory = config.directory().unwrap();
        assert_eq!(directory.len(), 2);
        let ta = directory
            .profile(StaffKey::TeachingAssistant(AssistantId(7)))
            .unwrap();
        assert_eq!(ta.category, EmploymentCategory::TeachingAssistant);
        assert_eq!(ta.max_hours, 10);
    }

    #[test]
    fn test_defaults() {
        let config: PlanningConfig = "".parse().unwrap();
        assert_eq!(config.coordinator.lock_timeout_ms, 250);
        assert_eq!(config.repository.repo_type, "local");
        assert!(config.repository.snapshot_path.is_none());
        assert!(config.staff.is_empty());
    }

    #[test]
    fn test_classroom_staff_rejected() {
        let toml = r#"
[[staff]]
kind = "classroom"
id = 101
category = "full_time"
max_hours = 20
"#;
        let config: PlanningConfig = toml.parse().unwrap();
        assert!(matches!(
            config.directory(),
            Err(RepositoryError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_duplicate_staff_rejected() {
        let entry = StaffConfig {
            kind: ResourceKind::Teacher,
            id: 3,
            category: EmploymentCategory::Adjunct,
            max_hours: 8,
        };
        let config = PlanningConfig {
            staff: vec![entry.clone(), entry],
            ..Default::default()
        };
        assert!(config.directory().is_err());
    }

    #[test]
    fn test_unknown_repository_type() {
        let config: PlanningConfig = "[repository]\ntype = \"postgres\"\n".parse().unwrap();
        assert!(config.repository_type().is_err());
    }
}
