//! Schedulable resources, proposed schedule items and their committed form.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::time::{TimeRange, ValidityWindow};
use super::workload::HourKind;
use crate::define_id_type;

define_id_type!(i64, ItemId);
define_id_type!(i64, ClassroomId);
define_id_type!(i64, TeacherId);
define_id_type!(i64, AssistantId);
define_id_type!(i64, SemesterId);

/// Correlation id of one allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        RequestId(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new_v4()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of schedulable entity. The declaration order is the lock and
/// report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Classroom,
    Teacher,
    TeachingAssistant,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Classroom => "classroom",
            ResourceKind::Teacher => "teacher",
            ResourceKind::TeachingAssistant => "teaching_assistant",
        }
    }
}

/// Identity of a schedulable entity.
///
/// Ordered by kind first, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResourceKey {
    Classroom(ClassroomId),
    Teacher(TeacherId),
    TeachingAssistant(AssistantId),
}

impl ResourceKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceKey::Classroom(_) => ResourceKind::Classroom,
            ResourceKey::Teacher(_) => ResourceKind::Teacher,
            ResourceKey::TeachingAssistant(_) => ResourceKind::TeachingAssistant,
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            ResourceKey::Classroom(id) => id.value(),
            ResourceKey::Teacher(id) => id.value(),
            ResourceKey::TeachingAssistant(id) => id.value(),
        }
    }

    /// The staff member behind this key, if it is a person.
    pub fn as_staff(&self) -> Option<StaffKey> {
        match *self {
            ResourceKey::Classroom(_) => None,
            ResourceKey::Teacher(id) => Some(StaffKey::Teacher(id)),
            ResourceKey::TeachingAssistant(id) => Some(StaffKey::TeachingAssistant(id)),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.raw_id())
    }
}

impl From<ClassroomId> for ResourceKey {
    fn from(id: ClassroomId) -> Self {
        ResourceKey::Classroom(id)
    }
}

impl From<TeacherId> for ResourceKey {
    fn from(id: TeacherId) -> Self {
        ResourceKey::Teacher(id)
    }
}

impl From<AssistantId> for ResourceKey {
    fn from(id: AssistantId) -> Self {
        ResourceKey::TeachingAssistant(id)
    }
}

/// A person who carries a workload: a teacher or a teaching assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StaffKey {
    Teacher(TeacherId),
    TeachingAssistant(AssistantId),
}

impl From<StaffKey> for ResourceKey {
    fn from(staff: StaffKey) -> Self {
        match staff {
            StaffKey::Teacher(id) => ResourceKey::Teacher(id),
            StaffKey::TeachingAssistant(id) => ResourceKey::TeachingAssistant(id),
        }
    }
}

impl fmt::Display for StaffKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ResourceKey::from(*self).fmt(f)
    }
}

/// Teaching modality tag. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modality(pub String);

impl Modality {
    pub fn new(tag: impl Into<String>) -> Self {
        Modality(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A proposed weekly class session, not yet committed.
///
/// One item books a classroom, a teacher and optionally a teaching assistant
/// for the same slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: ItemId,
    pub classroom: ClassroomId,
    pub teacher: TeacherId,
    #[serde(default)]
    pub assistant: Option<AssistantId>,
    pub time: TimeRange,
    pub validity: ValidityWindow,
    /// Requested seats; classroom items only.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub modality: Modality,
    #[serde(default)]
    pub accessibility_required: bool,
    /// How the teacher's hours for this session are booked.
    #[serde(default)]
    pub hour_kind: HourKind,
}

impl ScheduleItem {
    pub fn new(
        id: ItemId,
        classroom: ClassroomId,
        teacher: TeacherId,
        time: TimeRange,
        validity: ValidityWindow,
    ) -> Self {
        Self {
            id,
            classroom,
            teacher,
            assistant: None,
            time,
            validity,
            capacity: None,
            modality: Modality::default(),
            accessibility_required: false,
            hour_kind: HourKind::Regular,
        }
    }

    pub fn with_assistant(mut self, assistant: AssistantId) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Modality::new(modality);
        self
    }

    pub fn with_accessibility(mut self, required: bool) -> Self {
        self.accessibility_required = required;
        self
    }

    pub fn with_hour_kind(mut self, kind: HourKind) -> Self {
        self.hour_kind = kind;
        self
    }

    /// Every resource this item occupies, in key order.
    pub fn resource_keys(&self) -> Vec<ResourceKey> {
        let mut keys = vec![
            ResourceKey::Classroom(self.classroom),
            ResourceKey::Teacher(self.teacher),
        ];
        if let Some(assistant) = self.assistant {
            keys.push(ResourceKey::TeachingAssistant(assistant));
        }
        keys
    }

    /// Staff members booked by this item with the kind of hours each one gets.
    /// Assistants always book regular hours.
    pub fn staff_bookings(&self) -> Vec<(StaffKey, HourKind)> {
        let mut staff = vec![(StaffKey::Teacher(self.teacher), self.hour_kind)];
        if let Some(assistant) = self.assistant {
            staff.push((StaffKey::TeachingAssistant(assistant), HourKind::Regular));
        }
        staff
    }

    /// Weekly hours this item books, rounded up to whole hours.
    pub fn weekly_hours(&self) -> u32 {
        self.time.duration_minutes().div_ceil(60)
    }
}

/// Caller-supplied overrides. Whether to set them is boundary-layer policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllocationFlags {
    /// Commit even when the batch collides with committed slots.
    #[serde(default)]
    pub force_conflicts: bool,
    /// Commit even when a staff member would exceed their hour budget.
    #[serde(default)]
    pub allow_overage: bool,
}

/// One unit of work for the coordinator: a batch of items for one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    #[serde(default)]
    pub id: RequestId,
    pub semester: SemesterId,
    pub items: Vec<ScheduleItem>,
    #[serde(default)]
    pub flags: AllocationFlags,
}

impl AllocationRequest {
    pub fn new(semester: SemesterId, items: Vec<ScheduleItem>) -> Self {
        Self {
            id: RequestId::new_v4(),
            semester,
            items,
            flags: AllocationFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: AllocationFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Distinct resource keys touched by the batch, ascending.
    pub fn resource_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self
            .items
            .iter()
            .flat_map(|item| item.resource_keys())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// A schedule item that passed every check and was written into the index
/// and ledger. This is what the persistence layer stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedItem {
    pub id: ItemId,
    pub request_id: RequestId,
    pub semester: SemesterId,
    pub classroom: ClassroomId,
    pub teacher: TeacherId,
    pub assistant: Option<AssistantId>,
    pub time: TimeRange,
    pub validity: ValidityWindow,
    pub capacity: Option<u32>,
    pub modality: Modality,
    pub accessibility_required: bool,
    /// Hours booked per staff member.
    pub hours: Vec<StaffHours>,
}

/// Weekly hours one committed item books for one staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffHours {
    pub staff: StaffKey,
    pub kind: HourKind,
    pub hours: u32,
}

impl CommittedItem {
    pub fn from_item(item: &ScheduleItem, request_id: RequestId, semester: SemesterId) -> Self {
        let weekly = item.weekly_hours();
        let hours = item
            .staff_bookings()
            .into_iter()
            .map(|(staff, kind)| StaffHours {
                staff,
                kind,
                hours: weekly,
            })
            .collect();
        Self {
            id: item.id,
            request_id,
            semester,
            classroom: item.classroom,
            teacher: item.teacher,
            assistant: item.assistant,
            time: item.time,
            validity: item.validity,
            capacity: item.capacity,
            modality: item.modality.clone(),
            accessibility_required: item.accessibility_required,
            hours,
        }
    }

    pub fn resource_keys(&self) -> Vec<ResourceKey> {
        let mut keys = vec![
            ResourceKey::Classroom(self.classroom),
            ResourceKey::Teacher(self.teacher),
        ];
        if let Some(assistant) = self.assistant {
            keys.push(ResourceKey::TeachingAssistant(assistant));
        }
        keys
    }

    /// The proposal this item was committed from, for re-allocation.
    pub fn to_item(&self) -> ScheduleItem {
        let hour_kind = self
            .hours
            .iter()
            .find(|booking| booking.staff == StaffKey::Teacher(self.teacher))
            .map(|booking| booking.kind)
            .unwrap_or_default();
        ScheduleItem {
            id: self.id,
            classroom: self.classroom,
            teacher: self.teacher,
            assistant: self.assistant,
            time: self.time,
            validity: self.validity,
            capacity: self.capacity,
            modality: self.modality.clone(),
            accessibility_required: self.accessibility_required,
            hour_kind,
        }
    }
}

/// A reference to a committed slot returned by index queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommittedItemRef {
    pub item: ItemId,
    pub range: TimeRange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayOfWeek, EmploymentCategory};
    use chrono::NaiveDate;

    fn window() -> ValidityWindow {
        ValidityWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 23).unwrap(),
        )
    }

    fn item(id: i64, start: (u32, u32), end: (u32, u32)) -> ScheduleItem {
        let time = TimeRange::from_hm(DayOfWeek::Monday, start, end).unwrap();
        ScheduleItem::new(ItemId(id), ClassroomId(101), TeacherId(1), time, window())
    }

    #[test]
    fn test_resource_key_ordering() {
        let mut keys = vec![
            ResourceKey::TeachingAssistant(AssistantId(1)),
            ResourceKey::Teacher(TeacherId(2)),
            ResourceKey::Classroom(ClassroomId(9)),
            ResourceKey::Teacher(TeacherId(1)),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ResourceKey::Classroom(ClassroomId(9)),
                ResourceKey::Teacher(TeacherId(1)),
                ResourceKey::Teacher(TeacherId(2)),
                ResourceKey::TeachingAssistant(AssistantId(1)),
            ]
        );
    }

    #[test]
    fn test_resource_key_display() {
        assert_eq!(ResourceKey::Classroom(ClassroomId(101)).to_string(), "classroom:101");
        assert_eq!(
            StaffKey::TeachingAssistant(AssistantId(7)).to_string(),
            "teaching_assistant:7"
        );
    }

    #[test]
    fn test_item_resource_keys() {
        let plain = item(1, (8, 0), (10, 0));
        assert_eq!(plain.resource_keys().len(), 2);

        let with_ta = plain.with_assistant(AssistantId(5));
        assert_eq!(
            with_ta.resource_keys(),
            vec![
                ResourceKey::Classroom(ClassroomId(101)),
                ResourceKey::Teacher(TeacherId(1)),
                ResourceKey::TeachingAssistant(AssistantId(5)),
            ]
        );
    }

    #[test]
    fn test_weekly_hours_round_up() {
        assert_eq!(item(1, (8, 0), (10, 0)).weekly_hours(), 2);
        assert_eq!(item(1, (8, 0), (9, 30)).weekly_hours(), 2);
        assert_eq!(item(1, (8, 0), (8, 45)).weekly_hours(), 1);
        assert_eq!(item(1, (10, 0), (8, 0)).weekly_hours(), 0);
    }

    #[test]
    fn test_request_keys_are_deduplicated() {
        let request = AllocationRequest::new(
            SemesterId(1),
            vec![item(1, (8, 0), (10, 0)), item(2, (10, 0), (12, 0))],
        );
        assert_eq!(
            request.resource_keys(),
            vec![
                ResourceKey::Classroom(ClassroomId(101)),
                ResourceKey::Teacher(TeacherId(1)),
            ]
        );
    }

    #[test]
    fn test_committed_item_round_trip_to_item() {
        let original = item(3, (14, 0), (16, 0))
            .with_assistant(AssistantId(8))
            .with_capacity(30)
            .with_modality("in_person")
            .with_hour_kind(HourKind::Extra(EmploymentCategory::Adjunct));
        let committed = CommittedItem::from_item(&original, RequestId::new_v4(), SemesterId(4));

        assert_eq!(committed.hours.len(), 2);
        assert_eq!(
            committed.hours[1],
            StaffHours {
                staff: StaffKey::TeachingAssistant(AssistantId(8)),
                kind: HourKind::Regular,
                hours: 2,
            }
        );
        assert_eq!(committed.to_item(), original);
    }

    #[test]
    fn test_resource_key_serializes_tagged() {
        let key = ResourceKey::Teacher(TeacherId(12));
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"kind":"teacher","id":12}"#);
    }
}
