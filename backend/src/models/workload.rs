//! Workload bookkeeping types: hour categories, ledger entries and decisions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::schedule::{SemesterId, StaffKey};

/// Employment category of a staff member. Extra hours are tracked per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentCategory {
    FullTime,
    Adjunct,
    TeachingAssistant,
}

impl EmploymentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentCategory::FullTime => "full_time",
            EmploymentCategory::Adjunct => "adjunct",
            EmploymentCategory::TeachingAssistant => "teaching_assistant",
        }
    }
}

impl fmt::Display for EmploymentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmploymentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "full_time" | "fulltime" => Ok(EmploymentCategory::FullTime),
            "adjunct" => Ok(EmploymentCategory::Adjunct),
            "teaching_assistant" | "ta" => Ok(EmploymentCategory::TeachingAssistant),
            other => Err(format!("Unknown employment category: '{}'", other)),
        }
    }
}

/// Bucket an assignment's hours are booked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HourKind {
    #[default]
    Regular,
    Extra(EmploymentCategory),
}

impl fmt::Display for HourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HourKind::Regular => f.write_str("regular"),
            HourKind::Extra(category) => write!(f, "{}_extra", category),
        }
    }
}

/// Assigned hours for one staff member in one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub staff: StaffKey,
    pub semester: SemesterId,
    pub regular_hours: u32,
    #[serde(default)]
    pub extra_hours: BTreeMap<EmploymentCategory, u32>,
    pub max_hours: u32,
}

impl WorkloadEntry {
    pub fn new(staff: StaffKey, semester: SemesterId, max_hours: u32) -> Self {
        Self {
            staff,
            semester,
            regular_hours: 0,
            extra_hours: BTreeMap::new(),
            max_hours,
        }
    }

    /// Sum of extra hours over every category.
    pub fn extra_total(&self) -> u32 {
        self.extra_hours.values().sum()
    }

    /// Regular plus extra hours, recomputed on every call.
    pub fn total_hours(&self) -> u32 {
        self.regular_hours + self.extra_total()
    }

    /// Hours currently booked under `kind`.
    pub fn hours_of(&self, kind: HourKind) -> u32 {
        match kind {
            HourKind::Regular => self.regular_hours,
            HourKind::Extra(category) => self.extra_hours.get(&category).copied().unwrap_or(0),
        }
    }

    pub(crate) fn bucket_mut(&mut self, kind: HourKind) -> &mut u32 {
        match kind {
            HourKind::Regular => &mut self.regular_hours,
            HourKind::Extra(category) => self.extra_hours.entry(category).or_insert(0),
        }
    }
}

/// Outcome of a workload preview. `exceeds_by` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDecision {
    pub staff: StaffKey,
    pub semester: SemesterId,
    pub kind: HourKind,
    pub current_total: u32,
    pub requested_hours: u32,
    pub proposed_total: u32,
    pub max_hours: u32,
    pub exceeds_by: u32,
}

impl WorkloadDecision {
    pub fn within_budget(&self) -> bool {
        self.exceeds_by == 0
    }
}

/// One person over budget in a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadOverage {
    pub staff: StaffKey,
    pub semester: SemesterId,
    pub max_hours: u32,
    pub proposed_total: u32,
    pub exceeds_by: u32,
}

impl From<&WorkloadDecision> for WorkloadOverage {
    fn from(decision: &WorkloadDecision) -> Self {
        Self {
            staff: decision.staff,
            semester: decision.semester,
            max_hours: decision.max_hours,
            proposed_total: decision.proposed_total,
            exceeds_by: decision.exceeds_by,
        }
    }
}

/// A signed change applied to one ledger bucket, emitted for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub staff: StaffKey,
    pub semester: SemesterId,
    pub kind: HourKind,
    /// Positive when hours were added, negative when removed.
    pub hours: i64,
    /// Entry total after the change.
    pub total_after: u32,
    /// Budget recorded on the entry when the change was made.
    pub max_hours: u32,
}

impl LedgerDelta {
    /// The change that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            hours: -self.hours,
            ..*self
        }
    }

    /// Absolute number of hours moved.
    pub fn magnitude(&self) -> u32 {
        u32::try_from(self.hours.unsigned_abs()).unwrap_or(u32::MAX)
    }
}
