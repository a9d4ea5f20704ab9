//! Repository trait for committed schedules and workload.
//!
//! The coordinator keeps all state in memory; a repository is only consulted
//! at warm-up and after each successful commit or release.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{CommittedItem, WorkloadEntry};
use crate::services::{CommitOutcome, ReleaseOutcome};

/// Durable store for committed schedule items and workload entries.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait PlanningRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the backing store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Ok(false)` if it is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Warm-up ====================

    /// Every committed item, across all semesters.
    async fn load_committed_items(&self) -> RepositoryResult<Vec<CommittedItem>>;

    /// Every workload entry, across all semesters.
    async fn load_workload(&self) -> RepositoryResult<Vec<WorkloadEntry>>;

    // ==================== Write-back ====================

    /// Durably store the items and ledger deltas of a successful commit.
    ///
    /// # Returns
    /// * `Ok(())` - Everything in `outcome` is stored
    /// * `Err(RepositoryError)` - Nothing from `outcome` is stored
    async fn store_commit(&self, outcome: &CommitOutcome) -> RepositoryResult<()>;

    /// Durably remove released items and apply their ledger deltas.
    ///
    /// # Returns
    /// * `Ok(())` - The release is stored
    /// * `Err(RepositoryError::NotFound)` - A released item was never stored
    /// * `Err(RepositoryError)` - If the operation fails
    async fn store_release(&self, outcome: &ReleaseOutcome) -> RepositoryResult<()>;
}
