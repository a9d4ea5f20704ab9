//! Staff employment profiles.
//!
//! The coordinator asks the directory for a person's category and hour budget
//! every time it checks workload, so budget changes apply to the next request
//! without touching the ledger.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{EmploymentCategory, StaffKey};

/// Employment data for one staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub category: EmploymentCategory,
    /// Weekly hour budget per semester.
    pub max_hours: u32,
}

/// Source of staff profiles.
pub trait StaffDirectory: Send + Sync {
    /// Profile for `staff`, or `None` if the person is unknown.
    fn profile(&self, staff: StaffKey) -> Option<StaffProfile>;
}

/// In-memory directory, usually built from the `[[staff]]` entries of the
/// planning configuration.
#[derive(Debug, Default)]
pub struct ConfiguredDirectory {
    profiles: RwLock<HashMap<StaffKey, StaffProfile>>,
}

impl ConfiguredDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, staff: StaffKey, profile: StaffProfile) -> Self {
        self.set_profile(staff, profile);
        self
    }

    /// Insert or replace a profile. Returns the previous one.
    pub fn set_profile(&self, staff: StaffKey, profile: StaffProfile) -> Option<StaffProfile> {
        self.profiles.write().insert(staff, profile)
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

impl FromIterator<(StaffKey, StaffProfile)> for ConfiguredDirectory {
    fn from_iter<I: IntoIterator<Item = (StaffKey, StaffProfile)>>(iter: I) -> Self {
        Self {
            profiles: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl StaffDirectory for ConfiguredDirectory {
    fn profile(&self, staff: StaffKey) -> Option<StaffProfile> {
        self.profiles.read().get(&staff).copied()
    }
}
