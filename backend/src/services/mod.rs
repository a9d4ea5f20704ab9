//! Service layer: validation, workload bookkeeping and request coordination.
//!
//! [`AllocationCoordinator`] is the entry point. It owns the committed
//! [`IntervalIndex`](crate::algorithms::IntervalIndex) and [`WorkloadLedger`],
//! and runs each request through [`ScheduleValidator`], the conflict detector
//! and the ledger before committing it.

pub mod allocation;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod validation;
pub mod workload;

pub use allocation::{
    AllocationCoordinator, AmendOutcome, CommitOutcome, CoordinatorSettings, ReleaseOutcome,
    DEFAULT_LOCK_TIMEOUT,
};
pub use directory::{ConfiguredDirectory, StaffDirectory, StaffProfile};
pub use error::{AllocationError, AllocationResult, ErrorKind};
pub use lifecycle::{AllocationState, CancellationFlag, IllegalTransition, RequestLifecycle};
pub use locks::{ResourceLease, ResourceLocks};
pub use validation::{ScheduleValidator, ValidationError};
pub use workload::WorkloadLedger;
