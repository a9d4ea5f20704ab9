//! Validation rules for proposed schedule items.
//!
//! Single-item rules catch malformed input (dates, capacity, time ordering).
//! The batch rule catches items of the same request that collide with each
//! other, before anything is compared against committed state.
//!
//! Self-overlap detection groups items by day, sorts each day by
//! `(start, end, id)` and scans adjacent pairs. Sorting makes the result
//! independent of the order items arrive in.

use serde::Serialize;
use std::collections::BTreeMap;

use super::error::ErrorKind;
use crate::models::{DayOfWeek, ItemId, ScheduleItem, TimeRange, ValidityWindow};

/// A rule violation in a proposed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Invalid dates for item {item}: start date must be on or before end date ({window})")]
    InvalidDateRange { item: ItemId, window: ValidityWindow },

    #[error("Invalid capacity for item {item}: {capacity} (must be >= 1)")]
    InvalidCapacity { item: ItemId, capacity: u32 },

    #[error("Invalid time ordering for item {item}: start must be before end ({range})")]
    InvalidTimeOrdering { item: ItemId, range: TimeRange },

    #[error("At least one schedule is required")]
    MissingSchedule,

    #[error("Overlapping schedules on {day}: items {first} and {second}")]
    SelfOverlap {
        day: DayOfWeek,
        first: ItemId,
        second: ItemId,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::InvalidDateRange { .. } => ErrorKind::InvalidDateRange,
            ValidationError::InvalidCapacity { .. } => ErrorKind::InvalidCapacity,
            ValidationError::InvalidTimeOrdering { .. } => ErrorKind::InvalidTimeOrdering,
            ValidationError::MissingSchedule => ErrorKind::MissingSchedule,
            ValidationError::SelfOverlap { .. } => ErrorKind::SelfOverlap,
        }
    }

    /// Items named by this error.
    pub fn items(&self) -> Vec<ItemId> {
        match self {
            ValidationError::InvalidDateRange { item, .. }
            | ValidationError::InvalidCapacity { item, .. }
            | ValidationError::InvalidTimeOrdering { item, .. } => vec![*item],
            ValidationError::MissingSchedule => Vec::new(),
            ValidationError::SelfOverlap { first, second, .. } => vec![*first, *second],
        }
    }
}

/// Stateless rule set for proposed items.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleValidator;

impl ScheduleValidator {
    pub fn new() -> Self {
        ScheduleValidator
    }

    /// Check one item. Rules run in a fixed order and the first failure wins:
    /// dates, capacity, time ordering.
    pub fn validate_item(&self, item: &ScheduleItem) -> Result<(), ValidationError> {
        if !item.validity.is_valid() {
            return Err(ValidationError::InvalidDateRange {
                item: item.id,
                window: item.validity,
            });
        }
        if let Some(capacity) = item.capacity {
            if capacity < 1 {
                return Err(ValidationError::InvalidCapacity {
                    item: item.id,
                    capacity,
                });
            }
        }
        if !item.time.is_well_formed() {
            return Err(ValidationError::InvalidTimeOrdering {
                item: item.id,
                range: item.time,
            });
        }
        Ok(())
    }

    /// Check a whole request and return the first error: an empty batch, then
    /// each item in input order, then self-overlap.
    pub fn validate_batch(&self, items: &[ScheduleItem]) -> Result<(), ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::MissingSchedule);
        }
        for item in items {
            self.validate_item(item)?;
        }
        self.check_self_overlap(items)
    }

    /// Every error in a request. Self-overlap is only evaluated once all items
    /// are individually valid, since malformed ranges make it meaningless.
    pub fn collect_issues(&self, items: &[ScheduleItem]) -> Vec<ValidationError> {
        if items.is_empty() {
            return vec![ValidationError::MissingSchedule];
        }
        let mut issues: Vec<ValidationError> = items
            .iter()
            .filter_map(|item| self.validate_item(item).err())
            .collect();
        if issues.is_empty() {
            if let Err(overlap) = self.check_self_overlap(items) {
                issues.push(overlap);
            }
        }
        issues
    }

    /// Adjacent-pair scan per day. Days are visited Monday first; within a
    /// day the first colliding pair in sorted order is reported.
    pub fn check_self_overlap(&self, items: &[ScheduleItem]) -> Result<(), ValidationError> {
        let mut per_day: BTreeMap<DayOfWeek, Vec<&ScheduleItem>> = BTreeMap::new();
        for item in items {
            per_day.entry(item.time.day).or_default().push(item);
        }

        for (day, mut day_items) in per_day {
            day_items.sort_by_key(|item| (item.time.start, item.time.end, item.id));
            for pair in day_items.windows(2) {
                if pair[0].time.end > pair[1].time.start {
                    return Err(ValidationError::SelfOverlap {
                        day,
                        first: pair[0].id,
                        second: pair[1].id,
                    });
                }
            }
        }
        Ok(())
    }
}
