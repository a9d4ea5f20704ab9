//! Cross-checks proposed items against committed slots.
//!
//! Detection never stops at the first hit: every item is checked against
//! every resource it touches and the union of all collisions is returned, so
//! callers can show all problems of a batch at once.

use serde::{Deserialize, Serialize};

use super::interval_index::{ConflictCluster, IntervalIndex};
use crate::models::{ItemId, ResourceKey, ScheduleItem, TimeRange};

/// One proposed item colliding with committed slots of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub resource: ResourceKey,
    /// The proposed item.
    pub item: ItemId,
    /// The proposed item's range.
    pub range: TimeRange,
    /// Committed items it collides with, ascending.
    pub conflicting: Vec<ItemId>,
}

impl ConflictReport {
    fn sort_key(&self) -> (ResourceKey, Option<ItemId>, ItemId) {
        (self.resource, self.conflicting.first().copied(), self.item)
    }
}

/// Stateless detector over an [`IntervalIndex`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        ConflictDetector
    }

    /// Every collision between `items` and the committed slots in `index`.
    ///
    /// One report per (item, resource) pair that collided. Reports are ordered
    /// by resource, then first conflicting item, then proposed item.
    pub fn detect(&self, index: &IntervalIndex, items: &[ScheduleItem]) -> Vec<ConflictReport> {
        let mut reports = Vec::new();
        for item in items {
            for key in item.resource_keys() {
                let hits = index.query_within(&key, &item.time, &item.validity);
                if hits.is_empty() {
                    continue;
                }
                let mut conflicting: Vec<ItemId> = hits.iter().map(|hit| hit.item).collect();
                conflicting.sort();
                conflicting.dedup();
                reports.push(ConflictReport {
                    resource: key,
                    item: item.id,
                    range: item.time,
                    conflicting,
                });
            }
        }
        reports.sort_by_key(ConflictReport::sort_key);
        reports
    }

    /// Overlap clusters already present among committed slots, over every
    /// resource in the index. Only forced commits or rehydrated data can
    /// produce these.
    pub fn audit(&self, index: &IntervalIndex) -> Vec<ConflictCluster> {
        index
            .resources()
            .iter()
            .flat_map(|key| index.overlap_clusters(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AssistantId, ClassroomId, DayOfWeek, TeacherId, ValidityWindow,
    };
    use chrono::NaiveDate;

    fn semester() -> ValidityWindow {
        ValidityWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 23).unwrap(),
        )
    }

    fn monday(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::from_hm(DayOfWeek::Monday, start, end).unwrap()
    }

    fn item(id: i64, classroom: i64, teacher: i64, range: TimeRange) -> ScheduleItem {
        ScheduleItem::new(
            ItemId(id),
            ClassroomId(classroom),
            TeacherId(teacher),
            range,
            semester(),
        )
    }

    fn commit(index: &mut IntervalIndex, item: &ScheduleItem) {
        for key in item.resource_keys() {
            index.insert(key, item.time, item.id, item.validity);
        }
    }

    #[test]
    fn test_no_conflicts_on_empty_index() {
        let index = IntervalIndex::new();
        let proposed = vec![item(1, 101, 1, monday((8, 0), (10, 0)))];
        assert!(ConflictDetector::new().detect(&index, &proposed).is_empty());
    }

    #[test]
    fn test_classroom_conflict() {
        let mut index = IntervalIndex::new();
        commit(&mut index, &item(1, 101, 1, monday((8, 0), (10, 0))));

        let proposed = vec![item(2, 101, 2, monday((9, 0), (11, 0)))];
        let reports = ConflictDetector::new().detect(&index, &proposed);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].resource, ResourceKey::Classroom(ClassroomId(101)));
        assert_eq!(reports[0].item, ItemId(2));
        assert_eq!(reports[0].conflicting, vec![ItemId(1)]);
    }

    #[test]
    fn test_one_item_in_multiple_reports() {
        let mut index = IntervalIndex::new();
        commit(&mut index, &item(1, 101, 1, monday((8, 0), (10, 0))));

        // Same classroom and same teacher: both resources are busy.
        let proposed = vec![item(2, 101, 1, monday((9, 0), (10, 0)))];
        let reports = ConflictDetector::new().detect(&index, &proposed);

        let resources: Vec<ResourceKey> = reports.iter().map(|r| r.resource).collect();
        assert_eq!(
            resources,
            vec![
                ResourceKey::Classroom(ClassroomId(101)),
                ResourceKey::Teacher(TeacherId(1)),
            ]
        );
    }

    #[test]
    fn test_assistant_conflict() {
        let mut index = IntervalIndex::new();
        commit(
            &mut index,
            &item(1, 101, 1, monday((8, 0), (10, 0))).with_assistant(AssistantId(9)),
        );

        let proposed =
            vec![item(2, 202, 2, monday((9, 0), (10, 0))).with_assistant(AssistantId(9))];
        let reports = ConflictDetector::new().detect(&index, &proposed);
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].resource,
            ResourceKey::TeachingAssistant(AssistantId(9))
        );
    }

    #[test]
    fn test_reports_union_in_stable_order() {
        let mut index = IntervalIndex::new();
        commit(&mut index, &item(10, 300, 3, monday((8, 0), (9, 0))));
        commit(&mut index, &item(11, 100, 1, monday((8, 0), (9, 0))));
        commit(&mut index, &item(12, 100, 4, monday((12, 0), (13, 0))));

        let proposed = vec![
            item(2, 100, 5, monday((12, 30), (13, 30))),
            item(1, 300, 6, monday((8, 30), (9, 30))),
            item(3, 100, 7, monday((8, 0), (8, 30))),
        ];
        let detector = ConflictDetector::new();
        let reports = detector.detect(&index, &proposed);
        let summary: Vec<(i64, i64, i64)> = reports
            .iter()
            .map(|r| (r.resource.raw_id(), r.conflicting[0].value(), r.item.value()))
            .collect();
        assert_eq!(summary, vec![(100, 11, 3), (100, 12, 2), (300, 10, 1)]);

        let mut reversed = proposed.clone();
        reversed.reverse();
        assert_eq!(detector.detect(&index, &reversed), reports);
    }

    #[test]
    fn test_audit_lists_clusters_across_resources() {
        let mut index = IntervalIndex::new();
        commit(&mut index, &item(1, 101, 1, monday((8, 0), (10, 0))));
        commit(&mut index, &item(2, 101, 2, monday((9, 0), (11, 0))));

        let clusters = ConflictDetector::new().audit(&index);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].resource, ResourceKey::Classroom(ClassroomId(101)));
        assert_eq!(clusters[0].items, vec![ItemId(1), ItemId(2)]);
    }
}
