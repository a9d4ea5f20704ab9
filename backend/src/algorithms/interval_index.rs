//! Committed weekly slots per resource, kept sorted for overlap scans.
//!
//! The index answers one question: which committed slots of a classroom,
//! teacher or teaching assistant overlap a given weekly range. Each resource
//! keeps one bucket per day, sorted by `(start, end, item)`, so a query walks
//! the bucket until the first slot starting at or after the query's end.
//!
//! The index never rejects an insert. Overlap policy belongs to the conflict
//! detector; the index only records what was committed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    CommittedItemRef, DayOfWeek, ItemId, ResourceKey, TimeRange, ValidityWindow,
};

/// One committed slot of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedSlot {
    pub item: ItemId,
    pub range: TimeRange,
    pub window: ValidityWindow,
}

impl IndexedSlot {
    fn sort_key(&self) -> (chrono::NaiveTime, chrono::NaiveTime, ItemId) {
        (self.range.start, self.range.end, self.item)
    }

    fn as_ref(&self) -> CommittedItemRef {
        CommittedItemRef {
            item: self.item,
            range: self.range,
        }
    }

    /// Two committed slots that are busy at the same time on overlapping dates.
    fn collides_with(&self, other: &IndexedSlot) -> bool {
        self.range.overlaps(&other.range) && self.window.intersects(&other.window)
    }
}

/// A group of committed slots of one resource that all overlap each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCluster {
    pub resource: ResourceKey,
    pub day: DayOfWeek,
    /// Member items, ascending.
    pub items: Vec<ItemId>,
    /// Earliest start among members.
    pub start: chrono::NaiveTime,
    /// Latest end among members.
    pub end: chrono::NaiveTime,
}

type DayBuckets = BTreeMap<DayOfWeek, Vec<IndexedSlot>>;

/// Per-resource sorted collection of committed slots.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    resources: HashMap<ResourceKey, DayBuckets>,
    len: usize,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of slots across all resources.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resources with at least one committed slot, ascending.
    pub fn resources(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.resources.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Every committed slot of `key` on the same day overlapping `range`.
    pub fn query(&self, key: &ResourceKey, range: &TimeRange) -> Vec<CommittedItemRef> {
        self.scan(key, range).map(IndexedSlot::as_ref).collect()
    }

    /// As [`query`](Self::query), restricted to slots whose validity window
    /// intersects `window`.
    pub fn query_within(
        &self,
        key: &ResourceKey,
        range: &TimeRange,
        window: &ValidityWindow,
    ) -> Vec<CommittedItemRef> {
        self.scan(key, range)
            .filter(|slot| slot.window.intersects(window))
            .map(IndexedSlot::as_ref)
            .collect()
    }

    fn scan<'a>(
        &'a self,
        key: &ResourceKey,
        range: &'a TimeRange,
    ) -> impl Iterator<Item = &'a IndexedSlot> + 'a {
        self.resources
            .get(key)
            .and_then(|days| days.get(&range.day))
            .map(|slots| slots.as_slice())
            .unwrap_or(&[])
            .iter()
            .take_while(move |slot| slot.range.start < range.end)
            .filter(move |slot| slot.range.overlaps(range))
    }

    /// Insert a committed slot in sorted position.
    ///
    /// Callers must have checked for conflicts already; overlapping slots are
    /// stored as given.
    pub fn insert(
        &mut self,
        key: ResourceKey,
        range: TimeRange,
        item: ItemId,
        window: ValidityWindow,
    ) {
        let slot = IndexedSlot {
            item,
            range,
            window,
        };
        let bucket = self
            .resources
            .entry(key)
            .or_default()
            .entry(range.day)
            .or_default();
        let position = bucket.partition_point(|existing| existing.sort_key() <= slot.sort_key());
        bucket.insert(position, slot);
        self.len += 1;
    }

    /// Remove every slot of `item` under `key`. Returns how many were removed.
    ///
    /// Empty buckets are dropped so that insert followed by remove leaves the
    /// index exactly as it was.
    pub fn remove(&mut self, key: &ResourceKey, item: ItemId) -> usize {
        let Some(days) = self.resources.get_mut(key) else {
            return 0;
        };

        let mut removed = 0;
        days.retain(|_, slots| {
            let before = slots.len();
            slots.retain(|slot| slot.item != item);
            removed += before - slots.len();
            !slots.is_empty()
        });

        if days.is_empty() {
            self.resources.remove(key);
        }
        self.len -= removed;
        removed
    }

    pub fn contains(&self, key: &ResourceKey, item: ItemId) -> bool {
        self.resources
            .get(key)
            .map(|days| days.values().flatten().any(|slot| slot.item == item))
            .unwrap_or(false)
    }

    /// All slots of `key`, Monday first, each day in start order.
    pub fn slots(&self, key: &ResourceKey) -> Vec<IndexedSlot> {
        self.resources
            .get(key)
            .map(|days| days.values().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Group the committed slots of `key` into clusters of mutually
    /// overlapping slots.
    ///
    /// Seeds are visited in start order; each seed repeatedly grows a cluster
    /// from the slots that overlap every current member, until all of the
    /// seed's overlapping pairs are covered. Every overlapping pair therefore
    /// appears in exactly one cluster. Only clusters of two or more are
    /// returned.
    pub fn overlap_clusters(&self, key: &ResourceKey) -> Vec<ConflictCluster> {
        let Some(days) = self.resources.get(key) else {
            return Vec::new();
        };

        let mut clusters = Vec::new();
        for (day, slots) in days {
            let mut covered: HashSet<(usize, usize)> = HashSet::new();
            let pair = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };

            for seed in 0..slots.len() {
                loop {
                    let mut members = vec![seed];
                    for candidate in 0..slots.len() {
                        if candidate == seed || covered.contains(&pair(seed, candidate)) {
                            continue;
                        }
                        let overlaps_all = members
                            .iter()
                            .all(|&m| slots[m].collides_with(&slots[candidate]));
                        if overlaps_all {
                            for &m in &members {
                                covered.insert(pair(m, candidate));
                            }
                            members.push(candidate);
                        }
                    }

                    if members.len() < 2 {
                        break;
                    }

                    let mut items: Vec<ItemId> = members.iter().map(|&m| slots[m].item).collect();
                    items.sort();
                    let start = members.iter().map(|&m| slots[m].range.start).min();
                    let end = members.iter().map(|&m| slots[m].range.end).max();
                    if let (Some(start), Some(end)) = (start, end) {
                        clusters.push(ConflictCluster {
                            resource: *key,
                            day: *day,
                            items,
                            start,
                            end,
                        });
                    }
                }
            }
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassroomId;
    use chrono::NaiveDate;

    fn classroom(id: i64) -> ResourceKey {
        ResourceKey::Classroom(ClassroomId(id))
    }

    fn monday(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::from_hm(DayOfWeek::Monday, start, end).unwrap()
    }

    fn semester() -> ValidityWindow {
        ValidityWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 23).unwrap(),
        )
    }

    fn ids(refs: &[CommittedItemRef]) -> Vec<i64> {
        refs.iter().map(|r| r.item.value()).collect()
    }

    #[test]
    fn test_query_empty_index() {
        let index = IntervalIndex::new();
        assert!(index.query(&classroom(1), &monday((8, 0), (9, 0))).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_finds_overlapping_slots_only() {
        let mut index = IntervalIndex::new();
        let key = classroom(101);
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), semester());
        index.insert(key, monday((10, 0), (12, 0)), ItemId(2), semester());
        index.insert(key, monday((13, 0), (15, 0)), ItemId(3), semester());

        assert_eq!(ids(&index.query(&key, &monday((9, 0), (11, 0)))), vec![1, 2]);
        assert_eq!(ids(&index.query(&key, &monday((12, 0), (13, 0)))), Vec::<i64>::new());
        assert_eq!(ids(&index.query(&key, &monday((14, 0), (18, 0)))), vec![3]);
    }

    #[test]
    fn test_query_other_day_or_resource() {
        let mut index = IntervalIndex::new();
        index.insert(classroom(1), monday((8, 0), (10, 0)), ItemId(1), semester());

        let tuesday = TimeRange::from_hm(DayOfWeek::Tuesday, (8, 0), (10, 0)).unwrap();
        assert!(index.query(&classroom(1), &tuesday).is_empty());
        assert!(index.query(&classroom(2), &monday((8, 0), (10, 0))).is_empty());
    }

    #[test]
    fn test_insert_keeps_start_order() {
        let mut index = IntervalIndex::new();
        let key = classroom(1);
        index.insert(key, monday((14, 0), (15, 0)), ItemId(3), semester());
        index.insert(key, monday((8, 0), (9, 0)), ItemId(1), semester());
        index.insert(key, monday((11, 0), (12, 0)), ItemId(2), semester());

        let order: Vec<i64> = index.slots(&key).iter().map(|s| s.item.value()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_insert_does_not_reject_overlaps() {
        let mut index = IntervalIndex::new();
        let key = classroom(1);
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), semester());
        index.insert(key, monday((8, 0), (10, 0)), ItemId(2), semester());
        assert_eq!(index.query(&key, &monday((9, 0), (9, 30))).len(), 2);
    }

    #[test]
    fn test_query_within_skips_disjoint_windows() {
        let mut index = IntervalIndex::new();
        let key = classroom(1);
        let first_half = ValidityWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        );
        let second_half = ValidityWindow::new(
            NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 23).unwrap(),
        );
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), first_half);

        let range = monday((8, 0), (10, 0));
        assert!(index.query_within(&key, &range, &second_half).is_empty());
        assert_eq!(index.query_within(&key, &range, &semester()).len(), 1);
        assert_eq!(index.query(&key, &range).len(), 1);
    }

    #[test]
    fn test_remove_prunes_empty_buckets() {
        let mut index = IntervalIndex::new();
        let key = classroom(1);
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), semester());

        assert_eq!(index.remove(&key, ItemId(1)), 1);
        assert!(index.is_empty());
        assert!(index.resources().is_empty());
        assert_eq!(index.remove(&key, ItemId(1)), 0);
    }

    #[test]
    fn test_remove_leaves_other_items() {
        let mut index = IntervalIndex::new();
        let key = classroom(1);
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), semester());
        index.insert(key, monday((9, 0), (11, 0)), ItemId(2), semester());

        index.remove(&key, ItemId(1));
        assert!(!index.contains(&key, ItemId(1)));
        assert!(index.contains(&key, ItemId(2)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_overlap_clusters() {
        let mut index = IntervalIndex::new();
        let key = classroom(7);
        // 1 and 2 overlap, 2 and 3 overlap, 1 and 3 do not.
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), semester());
        index.insert(key, monday((9, 0), (11, 0)), ItemId(2), semester());
        index.insert(key, monday((10, 0), (12, 0)), ItemId(3), semester());
        index.insert(key, monday((15, 0), (16, 0)), ItemId(4), semester());

        let clusters = index.overlap_clusters(&key);
        let members: Vec<Vec<i64>> = clusters
            .iter()
            .map(|c| c.items.iter().map(|i| i.value()).collect())
            .collect();
        assert_eq!(members, vec![vec![1, 2], vec![2, 3]]);
        assert_eq!(clusters[0].start, chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(clusters[0].end, chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn test_overlap_clusters_mutual_group() {
        let mut index = IntervalIndex::new();
        let key = classroom(7);
        index.insert(key, monday((8, 0), (10, 0)), ItemId(1), semester());
        index.insert(key, monday((8, 30), (9, 30)), ItemId(2), semester());
        index.insert(key, monday((9, 0), (9, 45)), ItemId(3), semester());

        let clusters = index.overlap_clusters(&key);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].items, vec![ItemId(1), ItemId(2), ItemId(3)]);
    }
}
