//! Error taxonomy for allocation requests.
//!
//! Every variant is a normal, recoverable value: the boundary layer maps it to
//! a rejection for the end user. Nothing here is retried automatically.

use serde::Serialize;

use super::lifecycle::{AllocationState, IllegalTransition};
use super::validation::ValidationError;
use crate::algorithms::ConflictReport;
use crate::models::{HourKind, ItemId, ResourceKey, SemesterId, StaffKey, WorkloadOverage};

/// Result type for coordinator operations.
pub type AllocationResult<T> = Result<T, AllocationError>;

/// Stable tag for each rejection kind, for boundary-layer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidDateRange,
    InvalidCapacity,
    InvalidTimeOrdering,
    MissingSchedule,
    SelfOverlap,
    ResourceConflict,
    WorkloadExceeded,
    ConcurrentModification,
    LedgerInconsistency,
    UnknownStaff,
    UnknownItem,
    DuplicateItem,
    Cancelled,
    IllegalTransition,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidDateRange => "invalid_date_range",
            ErrorKind::InvalidCapacity => "invalid_capacity",
            ErrorKind::InvalidTimeOrdering => "invalid_time_ordering",
            ErrorKind::MissingSchedule => "missing_schedule",
            ErrorKind::SelfOverlap => "self_overlap",
            ErrorKind::ResourceConflict => "resource_conflict",
            ErrorKind::WorkloadExceeded => "workload_exceeded",
            ErrorKind::ConcurrentModification => "concurrent_modification",
            ErrorKind::LedgerInconsistency => "ledger_inconsistency",
            ErrorKind::UnknownStaff => "unknown_staff",
            ErrorKind::UnknownItem => "unknown_item",
            ErrorKind::DuplicateItem => "duplicate_item",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::IllegalTransition => "illegal_transition",
        }
    }
}

/// Why a request was not committed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Resource conflict: {} collision(s) with committed schedules", .0.len())]
    ResourceConflict(Vec<ConflictReport>),

    #[error("Workload exceeded for {} staff member(s)", .0.len())]
    WorkloadExceeded(Vec<WorkloadOverage>),

    /// A resource lock could not be acquired in time, or committed state
    /// changed underneath the request.
    #[error("Concurrent modification on {resource}: {reason}")]
    ConcurrentModification {
        resource: ResourceKey,
        reason: String,
    },

    /// Ledger bookkeeping went negative. Indicates a bug upstream.
    #[error(
        "Ledger inconsistency for {staff} in semester {semester}: \
         removing {requested} {kind} hour(s) but only {held} held"
    )]
    LedgerInconsistency {
        staff: StaffKey,
        semester: SemesterId,
        kind: HourKind,
        held: u32,
        requested: u32,
    },

    #[error("No employment profile configured for {0}")]
    UnknownStaff(StaffKey),

    #[error("Item {0} is not committed")]
    UnknownItem(ItemId),

    /// The id is already committed, or repeated within the batch.
    #[error("Item {0} is already scheduled")]
    DuplicateItem(ItemId),

    #[error("Request cancelled at {stage}")]
    Cancelled { stage: AllocationState },

    #[error(transparent)]
    Lifecycle(#[from] IllegalTransition),
}

impl AllocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AllocationError::Validation(e) => e.kind(),
            AllocationError::ResourceConflict(_) => ErrorKind::ResourceConflict,
            AllocationError::WorkloadExceeded(_) => ErrorKind::WorkloadExceeded,
            AllocationError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            AllocationError::LedgerInconsistency { .. } => ErrorKind::LedgerInconsistency,
            AllocationError::UnknownStaff(_) => ErrorKind::UnknownStaff,
            AllocationError::UnknownItem(_) => ErrorKind::UnknownItem,
            AllocationError::DuplicateItem(_) => ErrorKind::DuplicateItem,
            AllocationError::Cancelled { .. } => ErrorKind::Cancelled,
            AllocationError::Lifecycle(_) => ErrorKind::IllegalTransition,
        }
    }

    /// Item identifiers the rejection is about, ascending and deduplicated.
    /// Includes both proposed and committed items for conflicts.
    pub fn offending_items(&self) -> Vec<ItemId> {
        let mut ids = match self {
            AllocationError::Validation(e) => e.items(),
            AllocationError::ResourceConflict(reports) => reports
                .iter()
                .flat_map(|r| std::iter::once(r.item).chain(r.conflicting.iter().copied()))
                .collect(),
            AllocationError::UnknownItem(id) | AllocationError::DuplicateItem(id) => vec![*id],
            _ => Vec::new(),
        };
        ids.sort();
        ids.dedup();
        ids
    }
}
