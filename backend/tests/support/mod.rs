//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use academic_planning::models::{
    AllocationRequest, AssistantId, ClassroomId, DayOfWeek, EmploymentCategory, ItemId,
    ScheduleItem, SemesterId, StaffKey, TeacherId, TimeRange, ValidityWindow,
};
use academic_planning::services::{
    AllocationCoordinator, ConfiguredDirectory, CoordinatorSettings, StaffProfile,
};
use chrono::NaiveDate;

pub const SEMESTER: SemesterId = SemesterId(2025);

/// Spring term used by most fixtures.
pub fn spring() -> ValidityWindow {
    ValidityWindow::new(date(2025, 1, 20), date(2025, 5, 23))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

pub fn slot(day: DayOfWeek, start: (u32, u32), end: (u32, u32)) -> TimeRange {
    TimeRange::from_hm(day, start, end).expect("valid fixture time")
}

/// An item for `room` and `teacher` on `day` within the spring term.
pub fn item(
    id: i64,
    room: i64,
    teacher: i64,
    day: DayOfWeek,
    start: (u32, u32),
    end: (u32, u32),
) -> ScheduleItem {
    ScheduleItem::new(
        ItemId(id),
        ClassroomId(room),
        TeacherId(teacher),
        slot(day, start, end),
        spring(),
    )
}

pub fn monday(id: i64, room: i64, teacher: i64, start: (u32, u32), end: (u32, u32)) -> ScheduleItem {
    item(id, room, teacher, DayOfWeek::Monday, start, end)
}

pub fn request(items: Vec<ScheduleItem>) -> AllocationRequest {
    AllocationRequest::new(SEMESTER, items)
}

pub fn full_time(max_hours: u32) -> StaffProfile {
    StaffProfile {
        category: EmploymentCategory::FullTime,
        max_hours,
    }
}

/// Teachers 1..=5 with a 10 hour budget, assistants 1..=2 with 6 hours.
pub fn directory() -> ConfiguredDirectory {
    let teachers = (1..=5).map(|id| (StaffKey::Teacher(TeacherId(id)), full_time(10)));
    let assistants = (1..=2).map(|id| {
        (
            StaffKey::TeachingAssistant(AssistantId(id)),
            StaffProfile {
                category: EmploymentCategory::TeachingAssistant,
                max_hours: 6,
            },
        )
    });
    teachers.chain(assistants).collect()
}

pub fn coordinator() -> AllocationCoordinator {
    AllocationCoordinator::new(Arc::new(directory()), CoordinatorSettings::default())
}

pub fn coordinator_with_timeout(timeout: Duration) -> AllocationCoordinator {
    AllocationCoordinator::new(
        Arc::new(directory()),
        CoordinatorSettings {
            lock_timeout: timeout,
        },
    )
}

pub fn teacher(id: i64) -> StaffKey {
    StaffKey::Teacher(TeacherId(id))
}
