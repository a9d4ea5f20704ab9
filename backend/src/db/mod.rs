//! Persistence and configuration for the planning core.
//!
//! The coordinator keeps all committed state in memory. This module loads it
//! at warm-up and records every commit and release through the Repository
//! pattern, so storage backends can be swapped without touching the core.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - warm_up, allocate_and_store, release_and_store       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Trait (repository/) - Abstract Interface    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────────────────────┐
//!     │             Local Repository                  │
//!     │       (in-memory, JSON snapshots)             │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - `services`: High-level functions pairing coordinator and repository
//! - `repository`: Trait definition and error types
//! - `repositories::local`: In-memory implementation
//! - `factory`: Creates the repository selected by configuration
//! - `repo_config`: `planning.toml` loading

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

// ==================== Service Layer ====================

pub use services::{
    allocate_and_store, amend_and_store, force_allocate_and_store, health_check,
    release_and_store, warm_up,
    ServiceError, ServiceResult,
};

// ==================== Repository Pattern Exports ====================

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::{CoordinatorConfig, PlanningConfig, RepositorySettings, StaffConfig};
pub use repositories::{LocalRepository, PlanningSnapshot};
pub use repository::{ErrorContext, PlanningRepository, RepositoryError, RepositoryResult};
