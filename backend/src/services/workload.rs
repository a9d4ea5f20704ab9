//! Per-semester workload ledger.
//!
//! Tracks how many weekly hours each teacher and teaching assistant carries in
//! each semester, split into regular hours and extra hours per employment
//! category. Totals are always recomputed from the buckets.
//!
//! The ledger itself is not synchronized; the coordinator keeps it behind a
//! lock and only mutates it while holding the leases of the staff involved.

use log::error;
use std::collections::HashMap;

use super::error::{AllocationError, AllocationResult};
use crate::models::{
    HourKind, LedgerDelta, SemesterId, StaffKey, WorkloadDecision, WorkloadEntry,
};

#[derive(Debug, Clone, Default)]
pub struct WorkloadLedger {
    entries: HashMap<(StaffKey, SemesterId), WorkloadEntry>,
}

impl WorkloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preview adding `hours` for `staff`. Never mutates.
    ///
    /// `max_hours` comes from the staff directory at call time, so a changed
    /// budget applies immediately even to people with an existing entry.
    pub fn propose_hours(
        &self,
        staff: StaffKey,
        semester: SemesterId,
        kind: HourKind,
        hours: u32,
        max_hours: u32,
    ) -> WorkloadDecision {
        let current_total = self
            .entries
            .get(&(staff, semester))
            .map(WorkloadEntry::total_hours)
            .unwrap_or(0);
        let proposed_total = current_total.saturating_add(hours);
        WorkloadDecision {
            staff,
            semester,
            kind,
            current_total,
            requested_hours: hours,
            proposed_total,
            max_hours,
            exceeds_by: proposed_total.saturating_sub(max_hours),
        }
    }

    /// Add `hours` to the `kind` bucket, creating the entry on first use.
    pub fn commit_hours(
        &mut self,
        staff: StaffKey,
        semester: SemesterId,
        kind: HourKind,
        hours: u32,
        max_hours: u32,
    ) -> LedgerDelta {
        let entry = self
            .entries
            .entry((staff, semester))
            .or_insert_with(|| WorkloadEntry::new(staff, semester, max_hours));
        entry.max_hours = max_hours;
        let bucket = entry.bucket_mut(kind);
        *bucket = bucket.saturating_add(hours);

        LedgerDelta {
            staff,
            semester,
            kind,
            hours: i64::from(hours),
            total_after: entry.total_hours(),
            max_hours,
        }
    }

    /// Subtract `hours` from the `kind` bucket.
    ///
    /// Removing more than is held clamps the bucket to zero and returns
    /// [`AllocationError::LedgerInconsistency`]; the clamp is kept so the
    /// ledger never holds a negative value.
    pub fn remove_hours(
        &mut self,
        staff: StaffKey,
        semester: SemesterId,
        kind: HourKind,
        hours: u32,
    ) -> AllocationResult<LedgerDelta> {
        let held = self
            .entries
            .get(&(staff, semester))
            .map(|entry| entry.hours_of(kind))
            .unwrap_or(0);

        if held < hours {
            error!(
                "Ledger inconsistency for {} in semester {}: removing {} {} hour(s), {} held",
                staff, semester, hours, kind, held
            );
            if let Some(entry) = self.entries.get_mut(&(staff, semester)) {
                *entry.bucket_mut(kind) = 0;
            }
            return Err(AllocationError::LedgerInconsistency {
                staff,
                semester,
                kind,
                held,
                requested: hours,
            });
        }

        // held >= hours > 0 implies the entry exists; hours == 0 is a no-op.
        let (total_after, max_hours) = match self.entries.get_mut(&(staff, semester)) {
            Some(entry) => {
                *entry.bucket_mut(kind) -= hours;
                (entry.total_hours(), entry.max_hours)
            }
            None => (0, 0),
        };

        Ok(LedgerDelta {
            staff,
            semester,
            kind,
            hours: -i64::from(hours),
            total_after,
            max_hours,
        })
    }

    /// Replay a delta produced by another ledger, e.g. a persisted one.
    pub fn apply(&mut self, delta: &LedgerDelta) -> AllocationResult<LedgerDelta> {
        let hours = delta.magnitude();
        if delta.hours >= 0 {
            Ok(self.commit_hours(delta.staff, delta.semester, delta.kind, hours, delta.max_hours))
        } else {
            self.remove_hours(delta.staff, delta.semester, delta.kind, hours)
        }
    }

    /// Undo a previously applied delta.
    pub fn revert(&mut self, delta: &LedgerDelta) -> AllocationResult<LedgerDelta> {
        self.apply(&delta.inverse())
    }

    pub fn entry(&self, staff: StaffKey, semester: SemesterId) -> Option<&WorkloadEntry> {
        self.entries.get(&(staff, semester))
    }

    /// Entries of one semester, ordered by staff key.
    pub fn entries_for_semester(&self, semester: SemesterId) -> Vec<WorkloadEntry> {
        let mut entries: Vec<WorkloadEntry> = self
            .entries
            .values()
            .filter(|entry| entry.semester == semester)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.staff);
        entries
    }

    /// Every entry, ordered by (semester, staff).
    pub fn all_entries(&self) -> Vec<WorkloadEntry> {
        let mut entries: Vec<WorkloadEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|entry| (entry.semester, entry.staff));
        entries
    }

    /// Replace the ledger contents with previously persisted entries.
    pub fn load_entries(&mut self, entries: impl IntoIterator<Item = WorkloadEntry>) {
        self.entries = entries
            .into_iter()
            .map(|entry| ((entry.staff, entry.semester), entry))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
