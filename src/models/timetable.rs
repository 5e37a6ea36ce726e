//! Timetable (solution) model.
//!
//! A timetable is the set of entries produced for one request together
//! with the constraint violations that remain in it. Violations are data:
//! a timetable with violations is still a usable best-effort result.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::{SlotKey, TimetableEntry};

/// A generated timetable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timetable {
    /// Placed entries.
    pub entries: Vec<TimetableEntry>,
    /// Violations detected in `entries`.
    pub violations: Vec<Violation>,
}

/// A detected breach of a scheduling invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Which invariant is broken.
    pub kind: ViolationKind,
    /// Faculty involved (double-booking only).
    pub faculty_id: Option<String>,
    /// Batch involved.
    pub batch_id: Option<String>,
    /// Course involved (continuity only).
    pub course_id: Option<String>,
    /// Day of the offending group.
    pub day: Weekday,
    /// Period numbers of the offending group.
    pub periods: Vec<u8>,
    /// Group size: entries sharing the slot, or distinct labs on the day.
    pub count: usize,
    /// Human-readable description.
    pub message: String,
}

/// Classification of violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A faculty holds two entries in one slot.
    FacultyDoubleBooking,
    /// A batch holds two entries in one slot.
    BatchDoubleBooking,
    /// A batch has more distinct labs on one day than allowed.
    LabDensity,
    /// A theory course meets a batch in two adjacent periods.
    TheoryContinuity,
}

impl Violation {
    /// Faculty double-booking at `slot`.
    pub fn faculty_double_booking(
        faculty_id: impl Into<String>,
        slot: SlotKey,
        count: usize,
    ) -> Self {
        let faculty_id = faculty_id.into();
        Self {
            kind: ViolationKind::FacultyDoubleBooking,
            message: format!("Faculty {faculty_id} is scheduled {count} times on {slot}"),
            faculty_id: Some(faculty_id),
            batch_id: None,
            course_id: None,
            day: slot.day,
            periods: vec![slot.period],
            count,
        }
    }

    /// Batch double-booking at `slot`.
    pub fn batch_double_booking(batch_id: impl Into<String>, slot: SlotKey, count: usize) -> Self {
        let batch_id = batch_id.into();
        Self {
            kind: ViolationKind::BatchDoubleBooking,
            message: format!("Batch {batch_id} is scheduled {count} times on {slot}"),
            faculty_id: None,
            batch_id: Some(batch_id),
            course_id: None,
            day: slot.day,
            periods: vec![slot.period],
            count,
        }
    }

    /// Too many distinct labs for `batch_id` on `day`.
    pub fn lab_density(batch_id: impl Into<String>, day: Weekday, labs: usize, max: usize) -> Self {
        let batch_id = batch_id.into();
        Self {
            kind: ViolationKind::LabDensity,
            message: format!("Batch {batch_id} has {labs} labs on {day} (max allowed: {max})"),
            faculty_id: None,
            batch_id: Some(batch_id),
            course_id: None,
            day,
            periods: Vec::new(),
            count: labs,
        }
    }

    /// Adjacent theory periods for one (course, batch) on `day`.
    pub fn theory_continuity(
        course_id: impl Into<String>,
        batch_id: impl Into<String>,
        day: Weekday,
        first: u8,
        second: u8,
    ) -> Self {
        let course_id = course_id.into();
        let batch_id = batch_id.into();
        Self {
            kind: ViolationKind::TheoryContinuity,
            message: format!(
                "Course {course_id} for batch {batch_id} has consecutive periods \
                 on {day} ({first} and {second})"
            ),
            faculty_id: None,
            batch_id: Some(batch_id),
            course_id: Some(course_id),
            day,
            periods: vec![first, second],
            count: 2,
        }
    }
}

impl Timetable {
    /// Creates a timetable.
    pub fn new(entries: Vec<TimetableEntry>, violations: Vec<Violation>) -> Self {
        Self {
            entries,
            violations,
        }
    }

    /// Whether no violations remain.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries taught by a faculty, ordered by slot.
    pub fn entries_for_faculty(&self, faculty_id: &str) -> Vec<&TimetableEntry> {
        self.sorted_where(|e| e.faculty_id == faculty_id)
    }

    /// Entries attended by a batch, ordered by slot.
    pub fn entries_for_batch(&self, batch_id: &str) -> Vec<&TimetableEntry> {
        self.sorted_where(|e| e.batch_id == batch_id)
    }

    /// Entries for one (course, batch) pair, ordered by slot.
    pub fn entries_for_course_batch(
        &self,
        course_id: &str,
        batch_id: &str,
    ) -> Vec<&TimetableEntry> {
        self.sorted_where(|e| e.is_course_batch(course_id, batch_id))
    }

    /// Entries on a given day, ordered by period.
    pub fn entries_on(&self, day: Weekday) -> Vec<&TimetableEntry> {
        self.sorted_where(|e| e.day() == day)
    }

    /// Number of violations of a kind.
    pub fn violation_count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    fn sorted_where<F>(&self, pred: F) -> Vec<&TimetableEntry>
    where
        F: Fn(&TimetableEntry) -> bool,
    {
        let mut out: Vec<&TimetableEntry> = self.entries.iter().filter(|e| pred(e)).collect();
        out.sort_by_key(|e| e.slot);
        out
    }
}
