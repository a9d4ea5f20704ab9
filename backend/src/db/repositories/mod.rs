//! Repository implementations.
//!
//! - `local`: In-memory implementation with JSON snapshots, for tests, local
//!   development and single-process deployments
#[cfg(feature = "local-repo")]
pub mod local;

#[cfg(feature = "local-repo")]
pub use local::{LocalRepository, PlanningSnapshot};
