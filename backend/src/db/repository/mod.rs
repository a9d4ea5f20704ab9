//! Repository abstraction for the planning store.
//!
//! - [`error`]: Error types for repository and configuration operations
//! - [`planning`]: The [`PlanningRepository`] trait
//!
//! Service functions take `&R where R: PlanningRepository` (or
//! `&dyn PlanningRepository`), so any backend can be swapped in.

pub mod error;
pub mod planning;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use planning::PlanningRepository;
