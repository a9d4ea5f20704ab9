//! High-level planning service layer.
//!
//! Glues the in-memory [`AllocationCoordinator`] to any
//! [`PlanningRepository`]. The coordinator decides; the repository only
//! records what was decided. If recording fails the in-memory change is
//! undone so both sides agree.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Boundary layer (HTTP API, CLI, batch import)           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                            │
//! │  - Warm-up from persisted state                         │
//! │  - Commit, then persist, revert on failure              │
//! │  - Amend: persist both halves, undo on failure          │
//! └─────────┬─────────────────────────────┬─────────────────┘
//!           │                             │
//! ┌─────────▼──────────────┐   ┌──────────▼──────────────────┐
//! │ AllocationCoordinator  │   │ PlanningRepository (trait)  │
//! │ (in-memory core)       │   │  └─ LocalRepository         │
//! └────────────────────────┘   └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use academic_planning::db::{services, LocalRepository};
//! use academic_planning::services::{ConfiguredDirectory, CoordinatorSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let directory = Arc::new(ConfiguredDirectory::new());
//!     let coordinator =
//!         services::warm_up(&repo, directory, CoordinatorSettings::default()).await?;
//!     println!("{} committed item(s)", coordinator.committed_items().len());
//!     Ok(())
//! }
//! ```

use log::{error, info, warn};
use std::sync::Arc;

use super::repository::{PlanningRepository, RepositoryError, RepositoryResult};
use crate::models::{AllocationRequest, ItemId};
use crate::services::{
    AllocationCoordinator, AllocationError, AmendOutcome, CommitOutcome, CoordinatorSettings,
    ReleaseOutcome, StaffDirectory,
};

/// Failure of a service-layer operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The coordinator rejected the request. Nothing was persisted.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The repository failed. Any in-memory change was undone.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Persisting failed and the in-memory change could not be undone either.
    #[error("persisting failed ({persist}) and the in-memory state could not be restored ({undo})")]
    Diverged {
        persist: RepositoryError,
        undo: AllocationError,
    },

    /// The release half of an amend was stored, the commit half was not, and
    /// the stored release could not be taken back.
    #[error("persisting failed ({persist}) and the stored release could not be taken back ({compensate})")]
    PartiallyStored {
        persist: RepositoryError,
        compensate: RepositoryError,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ==================== Health & Connection ====================

/// Check if the repository is healthy.
///
/// This is a simple pass-through to the repository's health check.
pub async fn health_check<R: PlanningRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Warm-up ====================

/// Build a coordinator from everything the repository holds.
///
/// # Arguments
/// * `repo` - Repository implementation
/// * `directory` - Staff budgets used for workload checks
/// * `settings` - Coordinator settings (lock timeout)
///
/// # Returns
/// * `Ok(AllocationCoordinator)` holding the persisted items and workload
/// * `Err(ServiceError::Repository)` if the repository is unhealthy or a load fails
pub async fn warm_up<R: PlanningRepository + ?Sized>(
    repo: &R,
    directory: Arc<dyn StaffDirectory>,
    settings: CoordinatorSettings,
) -> ServiceResult<AllocationCoordinator> {
    if !repo.health_check().await? {
        return Err(RepositoryError::connection("Repository reported unhealthy during warm-up")
            .with_operation("warm_up")
            .into());
    }

    let items = repo.load_committed_items().await?;
    let workload = repo.load_workload().await?;

    let coordinator = AllocationCoordinator::new(directory, settings);
    let clusters = coordinator.rehydrate(items, workload);
    if !clusters.is_empty() {
        warn!(
            "Persisted state contains {} overlap cluster(s)",
            clusters.len()
        );
    }
    info!(
        "Warm-up complete: {} committed item(s)",
        coordinator.committed_items().len()
    );
    Ok(coordinator)
}

// ==================== Write-through ====================

/// Commit `request` in memory, then persist it.
///
/// If the repository rejects the outcome the in-memory commit is reverted and
/// the repository error is returned.
pub async fn allocate_and_store<R: PlanningRepository + ?Sized>(
    coordinator: &AllocationCoordinator,
    repo: &R,
    request: &AllocationRequest,
) -> ServiceResult<CommitOutcome> {
    let outcome = coordinator.allocate(request)?;
    persist_commit(coordinator, repo, outcome).await
}

/// As [`allocate_and_store`], overriding resource conflicts.
pub async fn force_allocate_and_store<R: PlanningRepository + ?Sized>(
    coordinator: &AllocationCoordinator,
    repo: &R,
    request: &AllocationRequest,
) -> ServiceResult<CommitOutcome> {
    let outcome = coordinator.force_allocate(request)?;
    persist_commit(coordinator, repo, outcome).await
}

/// Release items in memory, then persist the release.
///
/// If the repository rejects the release the items are reinstated.
pub async fn release_and_store<R: PlanningRepository + ?Sized>(
    coordinator: &AllocationCoordinator,
    repo: &R,
    item_ids: &[ItemId],
) -> ServiceResult<ReleaseOutcome> {
    let outcome = coordinator.release(item_ids)?;
    match repo.store_release(&outcome).await {
        Ok(()) => Ok(outcome),
        Err(persist) => {
            error!(
                "Failed to persist release of {} item(s): {}",
                outcome.released.len(),
                persist
            );
            match coordinator.reinstate(&outcome) {
                Ok(()) => Err(ServiceError::Repository(persist)),
                Err(undo) => Err(ServiceError::Diverged { persist, undo }),
            }
        }
    }
}

/// Amend in memory, then persist the release and the replacement.
///
/// The release is stored first. If either half fails the in-memory amend is
/// undone; a release that was already stored is taken back by storing the
/// released items again.
pub async fn amend_and_store<R: PlanningRepository + ?Sized>(
    coordinator: &AllocationCoordinator,
    repo: &R,
    superseded: &[ItemId],
    request: &AllocationRequest,
) -> ServiceResult<AmendOutcome> {
    let outcome = coordinator.amend(superseded, request)?;

    if let Err(persist) = repo.store_release(&outcome.released).await {
        error!(
            "Failed to persist amend of request {}, undoing: {}",
            request.id, persist
        );
        return Err(undo_amend(coordinator, &outcome, persist));
    }

    match repo.store_commit(&outcome.committed).await {
        Ok(()) => Ok(outcome),
        Err(persist) => {
            error!(
                "Stored release but not replacement for request {}, undoing: {}",
                request.id, persist
            );
            let reversal = CommitOutcome {
                request_id: outcome.committed.request_id,
                semester: outcome.committed.semester,
                committed: outcome.released.released.clone(),
                ledger_deltas: outcome
                    .released
                    .ledger_deltas
                    .iter()
                    .map(|delta| delta.inverse())
                    .collect(),
                warnings: Vec::new(),
            };
            if let Err(compensate) = repo.store_commit(&reversal).await {
                error!(
                    "Could not take back stored release for request {}: {}",
                    request.id, compensate
                );
                return Err(ServiceError::PartiallyStored {
                    persist,
                    compensate,
                });
            }
            Err(undo_amend(coordinator, &outcome, persist))
        }
    }
}

fn undo_amend(
    coordinator: &AllocationCoordinator,
    outcome: &AmendOutcome,
    persist: RepositoryError,
) -> ServiceError {
    let undone = coordinator
        .revert(&outcome.committed)
        .and_then(|()| coordinator.reinstate(&outcome.released));
    match undone {
        Ok(()) => ServiceError::Repository(persist),
        Err(undo) => ServiceError::Diverged { persist, undo },
    }
}

async fn persist_commit<R: PlanningRepository + ?Sized>(
    coordinator: &AllocationCoordinator,
    repo: &R,
    outcome: CommitOutcome,
) -> ServiceResult<CommitOutcome> {
    match repo.store_commit(&outcome).await {
        Ok(()) => Ok(outcome),
        Err(persist) => {
            error!(
                "Failed to persist request {}, reverting: {}",
                outcome.request_id, persist
            );
            match coordinator.revert(&outcome) {
                Ok(()) => Err(ServiceError::Repository(persist)),
                Err(undo) => Err(ServiceError::Diverged { persist, undo }),
            }
        }
    }
}
