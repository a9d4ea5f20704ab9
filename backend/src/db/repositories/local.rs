//! In-memory local repository implementation.
//!
//! Stores committed items and workload entries in memory. Suitable for unit
//! tests, local development and single-process deployments that persist
//! through JSON snapshots.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::db::repository::{ErrorContext, PlanningRepository, RepositoryError, RepositoryResult};
use crate::models::{CommittedItem, ItemId, LedgerDelta, WorkloadEntry};
use crate::services::{CommitOutcome, ReleaseOutcome, WorkloadLedger};

/// Serializable image of a planning store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningSnapshot {
    #[serde(default)]
    pub items: Vec<CommittedItem>,
    #[serde(default)]
    pub workload: Vec<WorkloadEntry>,
}

/// In-memory local repository.
///
/// Clones share the same underlying data.
///
/// # Example
/// ```
/// use academic_planning::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// let json = repo.export_json().unwrap();
/// let copy = LocalRepository::import_json(&json).unwrap();
/// assert_eq!(copy.item_count(), 0);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    items: BTreeMap<ItemId, CommittedItem>,
    ledger: WorkloadLedger,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            ledger: WorkloadLedger::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Build a repository from a snapshot.
    ///
    /// # Returns
    /// * `Err(RepositoryError::ValidationError)` if an item id appears twice
    pub fn from_snapshot(snapshot: PlanningSnapshot) -> RepositoryResult<Self> {
        let mut items = BTreeMap::new();
        for item in snapshot.items {
            let id = item.id;
            if items.insert(id, item).is_some() {
                return Err(RepositoryError::validation_with_context(
                    "Duplicate committed item in snapshot",
                    ErrorContext::new("from_snapshot")
                        .with_entity("committed_item")
                        .with_entity_id(id),
                ));
            }
        }
        let mut ledger = WorkloadLedger::new();
        ledger.load_entries(snapshot.workload);

        Ok(Self {
            data: Arc::new(RwLock::new(LocalData {
                items,
                ledger,
                is_healthy: true,
            })),
        })
    }

    /// Current contents, items by id and workload by (semester, staff).
    pub fn snapshot(&self) -> PlanningSnapshot {
        let data = self.data.read();
        PlanningSnapshot {
            items: data.items.values().cloned().collect(),
            workload: data.ledger.all_entries(),
        }
    }

    pub fn export_json(&self) -> RepositoryResult<String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| RepositoryError::from(e).with_operation("export_json"))
    }

    pub fn import_json(json: &str) -> RepositoryResult<Self> {
        let snapshot: PlanningSnapshot = serde_json::from_str(json)
            .map_err(|e| RepositoryError::from(e).with_operation("import_json"))?;
        Self::from_snapshot(snapshot)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RepositoryResult<()> {
        let json = self.export_json()?;
        fs::write(path.as_ref(), json)
            .map_err(|e| RepositoryError::from(e).with_operation("save_to_file"))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let json = fs::read_to_string(path.as_ref())
            .map_err(|e| RepositoryError::from(e).with_operation("load_from_file"))?;
        Self::import_json(&json)
    }

    /// Set the health status for testing connection failures.
    ///
    /// An unhealthy repository rejects every load and store.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let is_healthy = data.is_healthy;
        *data = LocalData {
            is_healthy,
            ..Default::default()
        };
    }

    pub fn item_count(&self) -> usize {
        self.data.read().items.len()
    }

    pub fn has_item(&self, id: ItemId) -> bool {
        self.data.read().items.contains_key(&id)
    }

    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Repository is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `deltas` to a copy of `ledger`, so a bad delta leaves the original
/// untouched.
fn apply_deltas(
    ledger: &WorkloadLedger,
    deltas: &[LedgerDelta],
    operation: &str,
) -> RepositoryResult<WorkloadLedger> {
    let mut updated = ledger.clone();
    for delta in deltas {
        updated.apply(delta).map_err(|e| {
            RepositoryError::validation_with_context(
                e.to_string(),
                ErrorContext::new(operation)
                    .with_entity("workload_entry")
                    .with_entity_id(delta.staff),
            )
        })?;
    }
    Ok(updated)
}

#[async_trait]
impl PlanningRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn load_committed_items(&self) -> RepositoryResult<Vec<CommittedItem>> {
        self.check_health("load_committed_items")?;
        Ok(self.data.read().items.values().cloned().collect())
    }

    async fn load_workload(&self) -> RepositoryResult<Vec<WorkloadEntry>> {
        self.check_health("load_workload")?;
        Ok(self.data.read().ledger.all_entries())
    }

    async fn store_commit(&self, outcome: &CommitOutcome) -> RepositoryResult<()> {
        self.check_health("store_commit")?;
        let mut data = self.data.write();

        if let Some(existing) = outcome
            .committed
            .iter()
            .find(|item| data.items.contains_key(&item.id))
        {
            return Err(RepositoryError::validation_with_context(
                "Committed item already stored",
                ErrorContext::new("store_commit")
                    .with_entity("committed_item")
                    .with_entity_id(existing.id),
            ));
        }

        let ledger = apply_deltas(&data.ledger, &outcome.ledger_deltas, "store_commit")?;
        data.ledger = ledger;
        for item in &outcome.committed {
            data.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn store_release(&self, outcome: &ReleaseOutcome) -> RepositoryResult<()> {
        self.check_health("store_release")?;
        let mut data = self.data.write();

        if let Some(missing) = outcome
            .released
            .iter()
            .find(|item| !data.items.contains_key(&item.id))
        {
            return Err(RepositoryError::not_found_with_context(
                "Released item was never stored",
                ErrorContext::new("store_release")
                    .with_entity("committed_item")
                    .with_entity_id(missing.id),
            ));
        }

        let ledger = apply_deltas(&data.ledger, &outcome.ledger_deltas, "store_release")?;
        data.ledger = ledger;
        for item in &outcome.released {
            data.items.remove(&item.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClassroomId, DayOfWeek, HourKind, RequestId, ScheduleItem, SemesterId, StaffKey,
        TeacherId, TimeRange, ValidityWindow,
    };
    use chrono::NaiveDate;

    fn committed(id: i64) -> CommittedItem {
        let item = ScheduleItem::new(
            ItemId(id),
            ClassroomId(101),
            TeacherId(1),
            TimeRange::from_hm(DayOfWeek::Monday, (8, 0), (10, 0)).unwrap(),
            ValidityWindow::new(
                NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
                NaiveDate::from_ymd_opt(2025, 5, 23).unwrap(),
            ),
        );
        CommittedItem::from_item(&item, RequestId::new_v4(), SemesterId(1))
    }

    fn delta(hours: i64, total_after: u32) -> LedgerDelta {
        LedgerDelta {
            staff: StaffKey::Teacher(TeacherId(1)),
            semester: SemesterId(1),
            kind: HourKind::Regular,
            hours,
            total_after,
            max_hours: 20,
        }
    }

    fn commit_outcome(id: i64) -> CommitOutcome {
        let item = committed(id);
        CommitOutcome {
            request_id: item.request_id,
            semester: item.semester,
            committed: vec![item],
            ledger_deltas: vec![delta(2, 2)],
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = LocalRepository::new();
        assert!(repo.health_check().await.unwrap());

        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        assert!(repo.load_committed_items().await.is_err());
    }

    #[tokio::test]
    async fn test_store_commit_and_load() {
        let repo = LocalRepository::new();
        repo.store_commit(&commit_outcome(1)).await.unwrap();

        let items = repo.load_committed_items().await.unwrap();
        assert_eq!(items.len(), 1);
        let workload = repo.load_workload().await.unwrap();
        assert_eq!(workload[0].regular_hours, 2);
        assert_eq!(workload[0].max_hours, 20);
    }

    #[tokio::test]
    async fn test_store_commit_rejects_duplicates() {
        let repo = LocalRepository::new();
        repo.store_commit(&commit_outcome(1)).await.unwrap();
        let err = repo.store_commit(&commit_outcome(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(repo.snapshot().workload[0].regular_hours, 2);
    }

    #[tokio::test]
    async fn test_store_release() {
        let repo = LocalRepository::new();
        let outcome = commit_outcome(1);
        repo.store_commit(&outcome).await.unwrap();

        let release = ReleaseOutcome {
            released: outcome.committed.clone(),
            ledger_deltas: vec![delta(-2, 0)],
        };
        repo.store_release(&release).await.unwrap();
        assert_eq!(repo.item_count(), 0);
        assert_eq!(repo.snapshot().workload[0].total_hours(), 0);

        let err = repo.store_release(&release).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bad_delta_leaves_store_untouched() {
        let repo = LocalRepository::new();
        let mut outcome = commit_outcome(1);
        outcome.ledger_deltas = vec![delta(-5, 0)];

        assert!(repo.store_commit(&outcome).await.is_err());
        assert_eq!(repo.item_count(), 0);
        assert!(repo.snapshot().workload.is_empty());
    }

    #[test]
    fn test_json_snapshot_round_trip() {
        let snapshot = PlanningSnapshot {
            items: vec![committed(1), committed(2)],
            workload: vec![WorkloadEntry::new(
                StaffKey::Teacher(TeacherId(1)),
                SemesterId(1),
                20,
            )],
        };
        let repo = LocalRepository::from_snapshot(snapshot.clone()).unwrap();
        let restored = LocalRepository::import_json(&repo.export_json().unwrap()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn test_snapshot_with_duplicate_items_is_rejected() {
        let snapshot = PlanningSnapshot {
            items: vec![committed(1), committed(1)],
            workload: vec![],
        };
        let err = LocalRepository::from_snapshot(snapshot).err().unwrap();
        assert_eq!(err.context().entity_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_clear_keeps_health_flag() {
        let repo = LocalRepository::from_snapshot(PlanningSnapshot {
            items: vec![committed(1)],
            workload: vec![],
        })
        .unwrap();
        repo.set_healthy(false);
        repo.clear();
        assert_eq!(repo.item_count(), 0);
        assert!(!repo.data.read().is_healthy);
    }
}
