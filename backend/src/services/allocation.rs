//! Allocation coordinator: the single entry point for committing schedules.
//!
//! # Pipeline
//!
//! ```text
//! AllocationRequest
//!        │
//! ┌──────▼──────────────────────────────┐
//! │ Received -> Validated               │  ScheduleValidator (no locks)
//! └──────┬──────────────────────────────┘
//!        │  lease every ResourceKey of the batch (ascending, all-or-nothing)
//! ┌──────▼──────────────────────────────┐
//! │ Validated -> ConflictChecked        │  ConflictDetector over the index
//! │ ConflictChecked -> WorkloadChecked  │  WorkloadLedger previews
//! └──────┬──────────────────────────────┘
//!        │  write locks on index, ledger, registry
//! ┌──────▼──────────────────────────────┐
//! │ WorkloadChecked -> Committed        │  journaled apply, rollback on failure
//! └──────┬──────────────────────────────┘
//!        │
//!   CommitOutcome (items + ledger deltas for persistence)
//! ```
//!
//! Any stage may end in `Rejected`; a raised [`CancellationFlag`] ends the
//! request in `Cancelled` after undoing whatever was already written.
//!
//! # Locking
//!
//! Resource leases serialize requests that share a classroom, teacher or
//! assistant. The index, ledger and registry locks are only held for short
//! in-memory sections and are always taken in that order.

use log::{debug, error, info, warn};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use super::directory::StaffDirectory;
use super::error::{AllocationError, AllocationResult};
use super::lifecycle::{AllocationState, CancellationFlag, RequestLifecycle};
use super::locks::{ResourceLease, ResourceLocks};
use super::validation::ScheduleValidator;
use super::workload::WorkloadLedger;
use crate::algorithms::{
    ConflictCluster, ConflictDetector, ConflictReport, IndexedSlot, IntervalIndex,
};
use crate::models::{
    AllocationFlags, AllocationRequest, CommittedItem, HourKind, ItemId, LedgerDelta,
    RequestId, ResourceKey, ScheduleItem, SemesterId, StaffKey, WorkloadDecision,
    WorkloadEntry, WorkloadOverage,
};

/// Default bound on waiting for resource leases.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// How long a request waits for its resource leases before failing with
    /// [`AllocationError::ConcurrentModification`].
    pub lock_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Everything a successful request wrote, for the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub request_id: RequestId,
    pub semester: SemesterId,
    pub committed: Vec<CommittedItem>,
    pub ledger_deltas: Vec<LedgerDelta>,
    /// Conflicts that were overridden by `force_conflicts`. Empty otherwise.
    pub warnings: Vec<ConflictReport>,
}

impl CommitOutcome {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.committed.iter().map(|item| item.id).collect()
    }

    pub fn is_forced(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Items removed by a release and the hours they gave back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub released: Vec<CommittedItem>,
    pub ledger_deltas: Vec<LedgerDelta>,
}

impl ReleaseOutcome {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.released.iter().map(|item| item.id).collect()
    }
}

/// Result of replacing committed items with a new batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendOutcome {
    pub released: ReleaseOutcome,
    pub committed: CommitOutcome,
}

/// Hours one staff member receives from a batch, per bucket.
#[derive(Debug, Clone)]
struct StaffPlan {
    staff: StaffKey,
    max_hours: u32,
    hours: BTreeMap<HourKind, u32>,
}

impl StaffPlan {
    fn total(&self) -> u32 {
        self.hours.values().sum()
    }

    fn primary_kind(&self) -> HourKind {
        self.hours.keys().next().copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
enum JournalEntry {
    Indexed { key: ResourceKey, item: ItemId },
    Registered(ItemId),
    Hours(LedgerDelta),
}

/// Write access to the committed state plus an undo journal.
struct WriteSet<'a> {
    index: RwLockWriteGuard<'a, IntervalIndex>,
    ledger: RwLockWriteGuard<'a, WorkloadLedger>,
    registry: RwLockWriteGuard<'a, BTreeMap<ItemId, CommittedItem>>,
    journal: Vec<JournalEntry>,
}

impl WriteSet<'_> {
    fn index_item(&mut self, item: &CommittedItem) {
        for key in item.resource_keys() {
            self.index.insert(key, item.time, item.id, item.validity);
            self.journal.push(JournalEntry::Indexed { key, item: item.id });
        }
    }

    fn register(&mut self, item: CommittedItem) {
        self.journal.push(JournalEntry::Registered(item.id));
        self.registry.insert(item.id, item);
    }

    fn book(&mut self, delta: LedgerDelta) {
        self.journal.push(JournalEntry::Hours(delta));
    }

    /// Remove a committed item from the index and registry. Not journaled.
    fn unlink(&mut self, item: &CommittedItem) {
        for key in item.resource_keys() {
            self.index.remove(&key, item.id);
        }
        self.registry.remove(&item.id);
    }

    /// Undo every journaled change, newest first.
    fn rollback(&mut self) -> usize {
        let undone = self.journal.len();
        while let Some(entry) = self.journal.pop() {
            match entry {
                JournalEntry::Indexed { key, item } => {
                    self.index.remove(&key, item);
                }
                JournalEntry::Registered(item) => {
                    self.registry.remove(&item);
                }
                JournalEntry::Hours(delta) => {
                    if let Err(e) = self.ledger.revert(&delta) {
                        error!("Rollback could not restore ledger for {}: {}", delta.staff, e);
                    }
                }
            }
        }
        undone
    }
}

/// Serializes allocation requests per resource and owns the committed state.
///
/// Construct one per deployment (or per test) and share it behind an `Arc`;
/// every operation takes `&self`.
pub struct AllocationCoordinator {
    directory: Arc<dyn StaffDirectory>,
    settings: CoordinatorSettings,
    locks: ResourceLocks,
    validator: ScheduleValidator,
    detector: ConflictDetector,
    index: RwLock<IntervalIndex>,
    ledger: RwLock<WorkloadLedger>,
    registry: RwLock<BTreeMap<ItemId, CommittedItem>>,
}

impl std::fmt::Debug for AllocationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationCoordinator")
            .field("settings", &self.settings)
            .field("committed_items", &self.registry.read().len())
            .field("indexed_slots", &self.index.read().len())
            .field("ledger_entries", &self.ledger.read().len())
            .finish()
    }
}

impl AllocationCoordinator {
    pub fn new(directory: Arc<dyn StaffDirectory>, settings: CoordinatorSettings) -> Self {
        Self {
            directory,
            settings,
            locks: ResourceLocks::new(),
            validator: ScheduleValidator::new(),
            detector: ConflictDetector::new(),
            index: RwLock::new(IntervalIndex::new()),
            ledger: RwLock::new(WorkloadLedger::new()),
            registry: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn settings(&self) -> CoordinatorSettings {
        self.settings
    }

    // ==================== Warm-up ====================

    /// Replace the committed state with previously persisted data.
    ///
    /// Returns the overlap clusters found among the loaded items. They are
    /// logged but not rejected: the data was already committed.
    pub fn rehydrate(
        &self,
        items: Vec<CommittedItem>,
        workload: Vec<WorkloadEntry>,
    ) -> Vec<ConflictCluster> {
        let mut writes = self.write_set();
        *writes.index = IntervalIndex::new();
        writes.registry.clear();

        let total = items.len();
        for item in items {
            if writes.registry.contains_key(&item.id) {
                warn!("Skipping duplicate committed item {} during warm-up", item.id);
                continue;
            }
            writes.index_item(&item);
            writes.registry.insert(item.id, item);
        }
        let entries = workload.len();
        writes.ledger.load_entries(workload);
        writes.journal.clear();

        let clusters = self.detector.audit(&writes.index);
        info!(
            "Rehydrated {} of {} committed item(s) and {} workload entries",
            writes.registry.len(),
            total,
            entries
        );
        log_clusters(&clusters);
        clusters
    }

    // ==================== Allocation ====================

    /// Run a request through the full pipeline using its own flags.
    pub fn allocate(&self, request: &AllocationRequest) -> AllocationResult<CommitOutcome> {
        self.allocate_with_cancel(request, &CancellationFlag::new())
    }

    /// As [`allocate`](Self::allocate), but conflicts with committed slots are
    /// reported as warnings instead of rejecting the request. Validation and
    /// workload rules still apply.
    pub fn force_allocate(&self, request: &AllocationRequest) -> AllocationResult<CommitOutcome> {
        let flags = AllocationFlags {
            force_conflicts: true,
            ..request.flags
        };
        let mut lifecycle = RequestLifecycle::new(request.id);
        let result = self.allocate_inner(&mut lifecycle, request, flags, &CancellationFlag::new());
        finish(&mut lifecycle, result)
    }

    /// Run a request that the caller may abandon by raising `cancel`.
    pub fn allocate_with_cancel(
        &self,
        request: &AllocationRequest,
        cancel: &CancellationFlag,
    ) -> AllocationResult<CommitOutcome> {
        let mut lifecycle = RequestLifecycle::new(request.id);
        let result = self.allocate_inner(&mut lifecycle, request, request.flags, cancel);
        finish(&mut lifecycle, result)
    }

    fn allocate_inner(
        &self,
        lifecycle: &mut RequestLifecycle,
        request: &AllocationRequest,
        flags: AllocationFlags,
        cancel: &CancellationFlag,
    ) -> AllocationResult<CommitOutcome> {
        self.validate(lifecycle, request, cancel)?;
        let _lease = self.lease(&request.resource_keys())?;
        self.check_and_commit(lifecycle, request, flags, cancel)
    }

    fn validate(
        &self,
        lifecycle: &mut RequestLifecycle,
        request: &AllocationRequest,
        cancel: &CancellationFlag,
    ) -> AllocationResult<()> {
        lifecycle.checkpoint(cancel)?;
        self.validator.validate_batch(&request.items)?;
        lifecycle.advance(AllocationState::Validated)?;
        Ok(())
    }

    fn lease(&self, keys: &[ResourceKey]) -> AllocationResult<ResourceLease> {
        let timeout = self.settings.lock_timeout;
        let lease = self
            .locks
            .acquire(keys, timeout)
            .map_err(|busy| AllocationError::ConcurrentModification {
                resource: busy,
                reason: format!("resource busy for more than {} ms", timeout.as_millis()),
            })?;
        debug!("Leased {} resource(s)", lease.keys().len());
        Ok(lease)
    }

    /// Conflict check, workload check and commit. Caller holds the leases.
    fn check_and_commit(
        &self,
        lifecycle: &mut RequestLifecycle,
        request: &AllocationRequest,
        flags: AllocationFlags,
        cancel: &CancellationFlag,
    ) -> AllocationResult<CommitOutcome> {
        lifecycle.checkpoint(cancel)?;

        let reports = self.detector.detect(&self.index.read(), &request.items);
        if !reports.is_empty() {
            if !flags.force_conflicts {
                return Err(AllocationError::ResourceConflict(reports));
            }
            warn!(
                "Request {} forced past {} conflict report(s)",
                request.id,
                reports.len()
            );
        }
        self.check_duplicates(&request.items)?;
        lifecycle.advance(AllocationState::ConflictChecked)?;
        lifecycle.checkpoint(cancel)?;

        let plans = self.plan_workload(&request.items)?;
        let overages: Vec<WorkloadOverage> = self
            .preview_plans(request.semester, &plans)
            .iter()
            .filter(|decision| !decision.within_budget())
            .map(WorkloadOverage::from)
            .collect();
        if !overages.is_empty() {
            if !flags.allow_overage {
                return Err(AllocationError::WorkloadExceeded(overages));
            }
            for overage in &overages {
                warn!(
                    "Request {} takes {} over budget by {} hour(s)",
                    request.id, overage.staff, overage.exceeds_by
                );
            }
        }
        lifecycle.advance(AllocationState::WorkloadChecked)?;
        lifecycle.checkpoint(cancel)?;

        let outcome = self.commit(lifecycle, request, &plans, reports, cancel)?;
        info!(
            "Request {} committed {} item(s) in semester {}",
            request.id,
            outcome.committed.len(),
            request.semester
        );
        Ok(outcome)
    }

    /// Reject ids that are repeated in the batch or already committed.
    fn check_duplicates(&self, items: &[ScheduleItem]) -> AllocationResult<()> {
        let registry = self.registry.read();
        let mut seen = BTreeSet::new();
        for item in items {
            if !seen.insert(item.id) || registry.contains_key(&item.id) {
                return Err(AllocationError::DuplicateItem(item.id));
            }
        }
        Ok(())
    }

    fn plan_workload(&self, items: &[ScheduleItem]) -> AllocationResult<Vec<StaffPlan>> {
        let mut hours: BTreeMap<StaffKey, BTreeMap<HourKind, u32>> = BTreeMap::new();
        for item in items {
            let weekly = item.weekly_hours();
            for (staff, kind) in item.staff_bookings() {
                *hours.entry(staff).or_default().entry(kind).or_insert(0) += weekly;
            }
        }

        hours
            .into_iter()
            .map(|(staff, hours)| {
                let profile = self
                    .directory
                    .profile(staff)
                    .ok_or(AllocationError::UnknownStaff(staff))?;
                Ok(StaffPlan {
                    staff,
                    max_hours: profile.max_hours,
                    hours,
                })
            })
            .collect()
    }

    fn preview_plans(&self, semester: SemesterId, plans: &[StaffPlan]) -> Vec<WorkloadDecision> {
        let ledger = self.ledger.read();
        plans
            .iter()
            .map(|plan| {
                ledger.propose_hours(
                    plan.staff,
                    semester,
                    plan.primary_kind(),
                    plan.total(),
                    plan.max_hours,
                )
            })
            .collect()
    }

    fn commit(
        &self,
        lifecycle: &mut RequestLifecycle,
        request: &AllocationRequest,
        plans: &[StaffPlan],
        warnings: Vec<ConflictReport>,
        cancel: &CancellationFlag,
    ) -> AllocationResult<CommitOutcome> {
        let forced = !warnings.is_empty();
        let mut writes = self.write_set();

        if !forced {
            let stale = self.detector.detect(&writes.index, &request.items);
            if let Some(report) = stale.first() {
                return Err(AllocationError::ConcurrentModification {
                    resource: report.resource,
                    reason: "committed state changed during the request".to_string(),
                });
            }
        }

        match Self::apply(&mut writes, lifecycle, request, plans, cancel) {
            Ok((committed, ledger_deltas)) => {
                if forced {
                    for key in request.resource_keys() {
                        log_clusters(&writes.index.overlap_clusters(&key));
                    }
                }
                Ok(CommitOutcome {
                    request_id: request.id,
                    semester: request.semester,
                    committed,
                    ledger_deltas,
                    warnings,
                })
            }
            Err(err) => {
                let undone = writes.rollback();
                debug!("Request {} rolled back {} change(s)", request.id, undone);
                Err(err)
            }
        }
    }

    fn apply(
        writes: &mut WriteSet<'_>,
        lifecycle: &mut RequestLifecycle,
        request: &AllocationRequest,
        plans: &[StaffPlan],
        cancel: &CancellationFlag,
    ) -> AllocationResult<(Vec<CommittedItem>, Vec<LedgerDelta>)> {
        let mut committed = Vec::with_capacity(request.items.len());
        for item in &request.items {
            lifecycle.checkpoint(cancel)?;
            let entry = CommittedItem::from_item(item, request.id, request.semester);
            writes.index_item(&entry);
            writes.register(entry.clone());
            committed.push(entry);
        }

        lifecycle.checkpoint(cancel)?;
        let mut deltas = Vec::new();
        for plan in plans {
            for (&kind, &hours) in &plan.hours {
                let delta =
                    writes
                        .ledger
                        .commit_hours(plan.staff, request.semester, kind, hours, plan.max_hours);
                writes.book(delta);
                deltas.push(delta);
            }
        }

        lifecycle.advance(AllocationState::Committed)?;
        Ok((committed, deltas))
    }

    fn write_set(&self) -> WriteSet<'_> {
        WriteSet {
            index: self.index.write(),
            ledger: self.ledger.write(),
            registry: self.registry.write(),
            journal: Vec::new(),
        }
    }

    // ==================== Release & amend ====================

    /// Remove committed items and give their hours back.
    ///
    /// Unknown ids reject the whole call. A ledger bucket that would go
    /// negative is clamped and logged; the release still completes and the
    /// delta records what was actually removed.
    pub fn release(&self, item_ids: &[ItemId]) -> AllocationResult<ReleaseOutcome> {
        let items = self.lookup(item_ids)?;
        let _lease = self.lease(&keys_of(&items))?;
        let outcome = self.release_locked(&items)?;
        info!("Released {} committed item(s)", outcome.released.len());
        Ok(outcome)
    }

    /// Replace `superseded` with the items of `request` as one unit.
    ///
    /// If the replacement is rejected the superseded items are restored.
    pub fn amend(
        &self,
        superseded: &[ItemId],
        request: &AllocationRequest,
    ) -> AllocationResult<AmendOutcome> {
        let mut lifecycle = RequestLifecycle::new(request.id);
        let result = self.amend_inner(&mut lifecycle, superseded, request, &CancellationFlag::new());
        finish(&mut lifecycle, result)
    }

    fn amend_inner(
        &self,
        lifecycle: &mut RequestLifecycle,
        superseded: &[ItemId],
        request: &AllocationRequest,
        cancel: &CancellationFlag,
    ) -> AllocationResult<AmendOutcome> {
        self.validate(lifecycle, request, cancel)?;
        let old = self.lookup(superseded)?;

        let mut keys = request.resource_keys();
        keys.extend(keys_of(&old));
        let _lease = self.lease(&keys)?;

        let released = self.release_locked(&old)?;
        match self.check_and_commit(lifecycle, request, request.flags, cancel) {
            Ok(committed) => {
                info!(
                    "Request {} replaced {} item(s) with {}",
                    request.id,
                    released.released.len(),
                    committed.committed.len()
                );
                Ok(AmendOutcome {
                    released,
                    committed,
                })
            }
            Err(err) => {
                self.restore(&released);
                Err(err)
            }
        }
    }

    fn lookup(&self, item_ids: &[ItemId]) -> AllocationResult<Vec<CommittedItem>> {
        let mut ids = item_ids.to_vec();
        ids.sort();
        ids.dedup();

        let registry = self.registry.read();
        ids.into_iter()
            .map(|id| {
                registry
                    .get(&id)
                    .cloned()
                    .ok_or(AllocationError::UnknownItem(id))
            })
            .collect()
    }

    /// Caller holds the leases for every key of `items`.
    fn release_locked(&self, items: &[CommittedItem]) -> AllocationResult<ReleaseOutcome> {
        let mut writes = self.write_set();
        for item in items {
            match writes.registry.get(&item.id) {
                None => return Err(AllocationError::UnknownItem(item.id)),
                Some(current) if current != item => {
                    warn!("Item {} changed while waiting for its lease", item.id);
                    return Err(AllocationError::ConcurrentModification {
                        resource: ResourceKey::Classroom(item.classroom),
                        reason: format!("item {} was replaced by another request", item.id),
                    });
                }
                Some(_) => {}
            }
        }

        let mut ledger_deltas = Vec::new();
        for item in items {
            writes.unlink(item);
            for booking in &item.hours {
                let removed = writes.ledger.remove_hours(
                    booking.staff,
                    item.semester,
                    booking.kind,
                    booking.hours,
                );
                match removed {
                    Ok(delta) => ledger_deltas.push(delta),
                    Err(AllocationError::LedgerInconsistency { held, .. }) if held > 0 => {
                        let entry = writes.ledger.entry(booking.staff, item.semester);
                        ledger_deltas.push(LedgerDelta {
                            staff: booking.staff,
                            semester: item.semester,
                            kind: booking.kind,
                            hours: -i64::from(held),
                            total_after: entry.map(WorkloadEntry::total_hours).unwrap_or(0),
                            max_hours: entry.map(|e| e.max_hours).unwrap_or(0),
                        });
                    }
                    Err(AllocationError::LedgerInconsistency { held: 0, .. }) => {}
                    Err(err) => {
                        let partial = ReleaseOutcome {
                            released: released_so_far(items, item),
                            ledger_deltas,
                        };
                        drop(writes);
                        self.restore(&partial);
                        return Err(err);
                    }
                }
            }
        }

        Ok(ReleaseOutcome {
            released: items.to_vec(),
            ledger_deltas,
        })
    }

    /// Put released items back. Caller holds the leases.
    fn restore(&self, released: &ReleaseOutcome) {
        let mut writes = self.write_set();
        for item in &released.released {
            writes.index_item(item);
            writes.registry.insert(item.id, item.clone());
        }
        for delta in &released.ledger_deltas {
            if let Err(e) = writes.ledger.revert(delta) {
                error!("Could not restore ledger for {}: {}", delta.staff, e);
            }
        }
        writes.journal.clear();
        debug!("Restored {} released item(s)", released.released.len());
    }

    /// Undo a commit that could not be persisted.
    pub fn revert(&self, outcome: &CommitOutcome) -> AllocationResult<()> {
        let _lease = self.lease(&keys_of(&outcome.committed))?;
        let mut writes = self.write_set();
        for item in &outcome.committed {
            if writes.registry.get(&item.id).map(|c| c.request_id) != Some(outcome.request_id) {
                return Err(AllocationError::UnknownItem(item.id));
            }
        }
        for item in &outcome.committed {
            for key in item.resource_keys() {
                writes.journal.push(JournalEntry::Indexed { key, item: item.id });
            }
            writes.journal.push(JournalEntry::Registered(item.id));
        }
        for delta in &outcome.ledger_deltas {
            writes.journal.push(JournalEntry::Hours(*delta));
        }
        writes.rollback();
        warn!(
            "Reverted request {} ({} item(s))",
            outcome.request_id,
            outcome.committed.len()
        );
        Ok(())
    }

    /// Undo a release that could not be persisted.
    ///
    /// Fails with `DuplicateItem` if one of the released ids was committed
    /// again in the meantime.
    pub fn reinstate(&self, released: &ReleaseOutcome) -> AllocationResult<()> {
        let _lease = self.lease(&keys_of(&released.released))?;
        {
            let registry = self.registry.read();
            if let Some(taken) = released
                .released
                .iter()
                .find(|item| registry.contains_key(&item.id))
            {
                return Err(AllocationError::DuplicateItem(taken.id));
            }
        }
        self.restore(released);
        warn!("Reinstated {} released item(s)", released.released.len());
        Ok(())
    }

    // ==================== Queries ====================

    /// Preview what adding `hours` would do to `staff`'s workload. Nothing is
    /// written.
    pub fn preview_workload(
        &self,
        staff: StaffKey,
        semester: SemesterId,
        kind: HourKind,
        hours: u32,
    ) -> AllocationResult<WorkloadDecision> {
        let profile = self
            .directory
            .profile(staff)
            .ok_or(AllocationError::UnknownStaff(staff))?;
        Ok(self
            .ledger
            .read()
            .propose_hours(staff, semester, kind, hours, profile.max_hours))
    }

    /// Committed items ordered by id.
    pub fn committed_items(&self) -> Vec<CommittedItem> {
        self.registry.read().values().cloned().collect()
    }

    pub fn committed_item(&self, id: ItemId) -> Option<CommittedItem> {
        self.registry.read().get(&id).cloned()
    }

    pub fn workload_entries(&self, semester: SemesterId) -> Vec<WorkloadEntry> {
        self.ledger.read().entries_for_semester(semester)
    }

    pub fn workload_entry(&self, staff: StaffKey, semester: SemesterId) -> Option<WorkloadEntry> {
        self.ledger.read().entry(staff, semester).cloned()
    }

    /// Every ledger entry, for snapshots.
    pub fn all_workload_entries(&self) -> Vec<WorkloadEntry> {
        self.ledger.read().all_entries()
    }

    /// Committed slots of one resource.
    pub fn slots(&self, key: &ResourceKey) -> Vec<IndexedSlot> {
        self.index.read().slots(key)
    }

    /// Overlap clusters currently present among committed slots.
    pub fn audit(&self) -> Vec<ConflictCluster> {
        self.detector.audit(&self.index.read())
    }
}

/// Items up to and including `current`, which is an element of `items`.
fn released_so_far(items: &[CommittedItem], current: &CommittedItem) -> Vec<CommittedItem> {
    let end = items
        .iter()
        .position(|item| item.id == current.id)
        .map_or(items.len(), |n| n + 1);
    items[..end].to_vec()
}

fn keys_of(items: &[CommittedItem]) -> Vec<ResourceKey> {
    let mut keys: Vec<ResourceKey> = items.iter().flat_map(|item| item.resource_keys()).collect();
    keys.sort();
    keys.dedup();
    keys
}

fn log_clusters(clusters: &[ConflictCluster]) {
    for cluster in clusters {
        warn!(
            "Overlapping committed slots on {} {} {}-{}: {:?}",
            cluster.resource,
            cluster.day,
            cluster.start.format("%H:%M"),
            cluster.end.format("%H:%M"),
            cluster.items
        );
    }
}

/// Log the outcome and move the lifecycle to its terminal state on failure.
fn finish<T>(lifecycle: &mut RequestLifecycle, result: AllocationResult<T>) -> AllocationResult<T> {
    if let Err(err) = &result {
        match err {
            AllocationError::Cancelled { stage } => {
                info!("Request {} cancelled at {}", lifecycle.request(), stage);
            }
            _ => {
                let stage = lifecycle.state();
                lifecycle.reject();
                warn!(
                    "Request {} rejected at {} ({}): {}",
                    lifecycle.request(),
                    stage,
                    err.kind().as_str(),
                    err
                );
            }
        }
    }
    result
}
