//! Weekly time slots and validity windows.
//!
//! A class session recurs every week on the same [`DayOfWeek`] between two
//! wall-clock times, for as long as its [`ValidityWindow`] lasts. Times are
//! kept at minute precision and intervals are half-open: a session ending at
//! 10:00 does not collide with one starting at 10:00.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(day: chrono::Weekday) -> Self {
        DayOfWeek::ALL[day.num_days_from_monday() as usize]
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    /// Accepts full English names or three-letter abbreviations, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        DayOfWeek::ALL
            .iter()
            .copied()
            .find(|day| day.as_str() == normalized || day.as_str()[..3] == normalized)
            .ok_or_else(|| format!("Unknown day of week: '{}'", s))
    }
}

/// A weekly slot: one day plus a half-open `[start, end)` wall-clock interval.
///
/// The type does not enforce `start < end` so that malformed input can be
/// carried to the validator and reported; see [`TimeRange::is_well_formed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub day: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Create a range, truncating both times to the minute.
    pub fn new(day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            day,
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
        }
    }

    /// Create a range from `(hour, minute)` pairs.
    ///
    /// Returns `None` if either pair is not a valid wall-clock time.
    pub fn from_hm(day: DayOfWeek, start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        let start = NaiveTime::from_hms_opt(start.0, start.1, 0)?;
        let end = NaiveTime::from_hms_opt(end.0, end.1, 0)?;
        Some(Self::new(day, start, end))
    }

    /// Parse a range from `HH:MM` strings.
    pub fn parse(day: DayOfWeek, start: &str, end: &str) -> Result<Self, String> {
        let parse_one = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M")
                .map_err(|e| format!("Invalid time '{}': {}", s, e))
        };
        Ok(Self::new(day, parse_one(start)?, parse_one(end)?))
    }

    /// `start < end`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Length in minutes; zero for malformed ranges.
    pub fn duration_minutes(&self) -> u32 {
        if !self.is_well_formed() {
            return 0;
        }
        let minutes = (self.end - self.start).num_minutes();
        u32::try_from(minutes).unwrap_or(0)
    }

    /// Half-open overlap on the same day: `a.start < b.end && b.start < a.end`.
    #[inline]
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

impl Ord for TimeRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.day
            .cmp(&other.day)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for TimeRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

/// The calendar span during which a weekly slot recurs.
///
/// Both bounds are inclusive. Either may be missing in raw input; a window
/// with a missing bound never intersects anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ValidityWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Both bounds present and `start <= end`.
    pub fn is_valid(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s <= e)
    }

    /// Inclusive date intersection.
    pub fn intersects(&self, other: &ValidityWindow) -> bool {
        match (self.start, self.end, other.start, other.end) {
            (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
                a_start <= b_end && b_start <= a_end
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "?".into());
        write!(f, "{}..{}", show(self.start), show(self.end))
    }
}
