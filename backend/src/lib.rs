//! # Academic Planning Core
//!
//! Conflict-free weekly scheduling and workload accounting for a university
//! semester plan.
//!
//! Classrooms, teachers and teaching assistants are booked into weekly time
//! slots within a date window. Every allocation request is validated, checked
//! against committed slots of each resource it touches, checked against each
//! staff member's hour budget, and then committed atomically or not at all.
//!
//! ## Features
//!
//! - **Interval index**: Committed slots per resource with half-open overlap queries
//! - **Validation**: Date windows, capacities, time ordering and in-batch overlaps
//! - **Conflict detection**: Proposed-vs-committed reports and overlap audits
//! - **Workload ledger**: Regular and extra hours per staff member and semester
//! - **Coordination**: Per-resource leases, journaled commits, cancellation
//! - **Persistence**: Repository trait with an in-memory JSON-snapshot backend
//!
//! ## Architecture
//!
//! - [`models`]: Value types shared by every layer
//! - [`algorithms`]: [`IntervalIndex`](algorithms::IntervalIndex) and conflict detection
//! - [`services`]: Validator, workload ledger and the [`AllocationCoordinator`](services::AllocationCoordinator)
//! - [`db`]: Repository pattern, configuration and the write-through service layer

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod db;
pub mod models;
pub mod services;
