//! Repository factory for dependency injection.
//!
//! Creates the persistence collaborator selected by the `[repository]`
//! section of the planning configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::{PlanningConfig, RepositorySettings};
use super::repositories::LocalRepository;
use super::repository::{PlanningRepository, RepositoryResult};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory local repository, optionally seeded from a JSON snapshot
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Parse repository type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("local", "memory")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" | "in-memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryType::Local => f.write_str("local"),
        }
    }
}

/// Repository factory for creating repository instances.
///
/// # Example
/// ```no_run
/// use academic_planning::db::{PlanningConfig, RepositoryFactory};
///
/// let config = PlanningConfig::from_default_location()?;
/// let repo = RepositoryFactory::from_config(&config)?;
/// # Ok::<(), academic_planning::db::RepositoryError>(())
/// ```
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create a repository instance based on type.
    ///
    /// # Arguments
    /// * `repo_type` - Type of repository to create
    /// * `settings` - Repository settings (snapshot path for local)
    ///
    /// # Returns
    /// * `Ok(Arc<dyn PlanningRepository>)` - Shared repository instance
    /// * `Err(RepositoryError)` - If the snapshot cannot be loaded
    pub fn create(
        repo_type: RepositoryType,
        settings: &RepositorySettings,
    ) -> RepositoryResult<Arc<dyn PlanningRepository>> {
        match repo_type {
            RepositoryType::Local => match &settings.snapshot_path {
                Some(path) if path.exists() => Self::create_local_from_snapshot(path),
                Some(path) => {
                    log::info!(
                        "Snapshot {} not found, starting with an empty repository",
                        path.display()
                    );
                    Ok(Self::create_local())
                }
                None => Ok(Self::create_local()),
            },
        }
    }

    /// Create an empty in-memory local repository.
    pub fn create_local() -> Arc<dyn PlanningRepository> {
        Arc::new(LocalRepository::new())
    }

    /// Create a local repository seeded from a JSON snapshot file.
    pub fn create_local_from_snapshot<P: AsRef<Path>>(
        path: P,
    ) -> RepositoryResult<Arc<dyn PlanningRepository>> {
        let repo = LocalRepository::load_from_file(path.as_ref())
            .map_err(|e| e.with_operation("create_local_from_snapshot"))?;
        Ok(Arc::new(repo))
    }

    /// Create the repository described by a planning configuration.
    pub fn from_config(config: &PlanningConfig) -> RepositoryResult<Arc<dyn PlanningRepository>> {
        let repo_type = config.repository_type()?;
        Self::create(repo_type, &config.repository)
    }

    /// Create repository from a TOML configuration file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the planning.toml configuration file
    pub fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> RepositoryResult<Arc<dyn PlanningRepository>> {
        let config = PlanningConfig::from_file(config_path)?;
        Self::from_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_repository_type_from_str() {
        assert_eq!("local".parse::<RepositoryType>(), Ok(RepositoryType::Local));
        assert_eq!("Memory".parse::<RepositoryType>(), Ok(RepositoryType::Local));
        assert!("postgres".parse::<RepositoryType>().is_err());
    }

    #[tokio::test]
    async fn test_missing_snapshot_gives_empty_repository() {
        let settings = RepositorySettings {
            repo_type: "local".to_string(),
            snapshot_path: Some(PathBuf::from("/nonexistent/planning-snapshot.json")),
        };
        let repo = RepositoryFactory::create(RepositoryType::Local, &settings).unwrap();
        assert!(repo.health_check().await.unwrap());
        assert!(repo.load_committed_items().await.unwrap().is_empty());
    }
}
