//! Interval bookkeeping and conflict detection.
//!
//! # Components
//!
//! - [`interval_index`]: Committed slots per resource, sorted for overlap scans
//! - [`conflicts`]: Proposed-vs-committed conflict reports and overlap audits
//!
//! # Example
//!
//! ```
//! use academic_planning::algorithms::{ConflictDetector, IntervalIndex};
//! use academic_planning::models::*;
//! use chrono::NaiveDate;
//!
//! let window = ValidityWindow::new(
//!     NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
//!     NaiveDate::from_ymd_opt(2025, 5, 23).unwrap(),
//! );
//! let monday = |s, e| TimeRange::from_hm(DayOfWeek::Monday, s, e).unwrap();
//!
//! let mut index = IntervalIndex::new();
//! index.insert(ClassroomId(101).into(), monday((8, 0), (10, 0)), ItemId(1), window);
//!
//! let proposed = ScheduleItem::new(ItemId(2), ClassroomId(101), TeacherId(7), monday((9, 0), (11, 0)), window);
//! let reports = ConflictDetector::new().detect(&index, &[proposed]);
//! assert_eq!(reports[0].conflicting, vec![ItemId(1)]);
//! ```

pub mod conflicts;
pub mod interval_index;

pub use conflicts::{ConflictDetector, ConflictReport};
pub use interval_index::{ConflictCluster, IndexedSlot, IntervalIndex};
